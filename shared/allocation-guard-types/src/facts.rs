use alloy_primitives::{Address, U256};

/// Errors during oracle/vault fact acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactsError {
    /// Used by off-chain mocks or partially implemented providers.
    NotImplemented,
    /// The feed at this address is unknown or its read reverted.
    FeedUnavailable { feed: Address },
    /// Return data was malformed or could not be decoded.
    MalformedReturn,
}

/// Latest answer of an asset/USD price feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriceReading {
    pub price: U256,
    pub decimals: u8,
    /// Unix timestamp of the round that produced `price`.
    pub updated_at: u64,
}

impl PriceReading {
    /// Price expressed in basis points of 1.0 (par = 10_000).
    pub fn as_bps_of_par(&self) -> U256 {
        let one = U256::from(10u64)
            .checked_pow(U256::from(self.decimals))
            .unwrap_or(U256::MAX);
        self.price.saturating_mul(U256::from(10_000u64)) / one
    }
}

/// L2 sequencer uptime feed answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequencerStatus {
    pub is_up: bool,
    /// Unix timestamp at which the current status began.
    pub status_since: u64,
}

/// Externally trusted inputs consumed by the risk engine, implemented differently on-chain vs
/// in tests.
pub trait MarketFacts {
    fn latest_price(&self, _feed: Address) -> Result<PriceReading, FactsError> {
        Err(FactsError::NotImplemented)
    }

    fn sequencer_status(&self, _feed: Address) -> Result<SequencerStatus, FactsError> {
        Err(FactsError::NotImplemented)
    }

    /// Total value managed by the wallet, denominated like intent amounts.
    fn total_managed_assets(&self) -> Result<U256, FactsError> {
        Err(FactsError::NotImplemented)
    }
}
