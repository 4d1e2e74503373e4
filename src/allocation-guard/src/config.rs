//! Engine configuration.
//!
//! Amounts are denominated in the smallest unit of the managed stable asset (USDC: 6 decimals).
//! Loaded from TOML at construction; later changes go through the admin surface, and anything
//! that loosens a limit goes through the timelock.

use std::path::Path;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{constants::BPS_DENOMINATOR, errors::ConfigError};

const USDC: u64 = 1_000_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskLimits {
    /// Single-transaction ceiling; no approval lifts it.
    pub max_tx_amount: u64,
    /// Rolling 24h ceiling across all actions.
    pub daily_cap: u64,
    /// Above this amount (and up to `max_tx_amount`) an action needs multisig approval.
    pub large_transfer_threshold: u64,
    pub rebalance_cooldown_secs: u64,
    /// Consecutive execution failures that open the circuit breaker.
    pub failure_threshold: u32,
    /// Allowed deviation of the stable asset from par, both directions.
    pub depeg_band_bps: u16,
    /// Allowed move between `priceAtSign` and the live price.
    pub max_price_drift_bps: u16,
    pub max_oracle_age_secs: u64,
    /// Time the sequencer must have been back up before actions resume.
    pub sequencer_grace_period_secs: u64,
    /// Concentration cap assigned to newly approved protocols.
    pub default_concentration_cap_bps: u16,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_tx_amount: 250_000 * USDC,
            daily_cap: 1_000_000 * USDC,
            large_transfer_threshold: 100_000 * USDC,
            rebalance_cooldown_secs: 4 * 60 * 60,
            failure_threshold: 3,
            depeg_band_bps: 50,
            max_price_drift_bps: 100,
            max_oracle_age_secs: 60 * 60,
            sequencer_grace_period_secs: 60 * 60,
            default_concentration_cap_bps: 5_000,
        }
    }
}

impl RiskLimits {
    pub fn max_tx(&self) -> U256 {
        U256::from(self.max_tx_amount)
    }

    pub fn daily(&self) -> U256 {
        U256::from(self.daily_cap)
    }

    pub fn escalation_threshold(&self) -> U256 {
        U256::from(self.large_transfer_threshold)
    }

    /// True when `self` is less restrictive than `current` in any dimension.
    ///
    /// Loosening changes must wait out the timelock; tightening applies immediately.
    pub fn loosens(&self, current: &RiskLimits) -> bool {
        self.max_tx_amount > current.max_tx_amount
            || self.daily_cap > current.daily_cap
            || self.large_transfer_threshold > current.large_transfer_threshold
            || self.rebalance_cooldown_secs < current.rebalance_cooldown_secs
            || self.failure_threshold > current.failure_threshold
            || self.depeg_band_bps > current.depeg_band_bps
            || self.max_price_drift_bps > current.max_price_drift_bps
            || self.max_oracle_age_secs > current.max_oracle_age_secs
            || self.sequencer_grace_period_secs < current.sequencer_grace_period_secs
            || self.default_concentration_cap_bps > current.default_concentration_cap_bps
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid("failure_threshold must be at least 1"));
        }
        if u64::from(self.depeg_band_bps) >= BPS_DENOMINATOR {
            return Err(ConfigError::Invalid("depeg_band_bps must be below 10000"));
        }
        if u64::from(self.default_concentration_cap_bps) > BPS_DENOMINATOR {
            return Err(ConfigError::Invalid("default_concentration_cap_bps exceeds 10000"));
        }
        if self.max_tx_amount > self.daily_cap {
            return Err(ConfigError::Invalid("max_tx_amount exceeds daily_cap"));
        }
        if self.large_transfer_threshold > self.max_tx_amount {
            return Err(ConfigError::Invalid("large_transfer_threshold exceeds max_tx_amount"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Distinct Admin/Guardian approvals needed to run an escalated action.
    pub required_approvals: u32,
    pub timelock_delay_secs: u64,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            required_approvals: 2,
            timelock_delay_secs: 2 * 24 * 60 * 60,
        }
    }
}

/// Oracle feeds read by the risk engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleFeeds {
    /// Stable asset / USD price feed.
    pub price_feed: Address,
    /// L2 sequencer uptime feed; absent on chains without a sequencer.
    #[serde(default)]
    pub sequencer_feed: Option<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub chain_id: u64,
    pub admin: Address,
    pub agent: Address,
    #[serde(default)]
    pub guardians: Vec<Address>,
    /// Addresses allowed to relay agent-signed submissions besides the agent itself.
    #[serde(default)]
    pub relayers: Vec<Address>,
    pub oracle: OracleFeeds,
    #[serde(default)]
    pub limits: RiskLimits,
    #[serde(default)]
    pub governance: GovernanceParams,
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id == 0 {
            return Err(ConfigError::Invalid("chain_id must be non-zero"));
        }
        if self.admin == Address::ZERO || self.agent == Address::ZERO {
            return Err(ConfigError::Invalid("admin and agent must be set"));
        }
        if self.relayers.contains(&Address::ZERO) {
            return Err(ConfigError::Invalid("relayer address is zero"));
        }
        if self.oracle.price_feed == Address::ZERO {
            return Err(ConfigError::Invalid("oracle.price_feed must be set"));
        }
        if self.governance.required_approvals == 0 {
            return Err(ConfigError::Invalid("required_approvals must be at least 1"));
        }
        self.limits.validate()
    }
}
