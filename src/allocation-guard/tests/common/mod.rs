#![allow(dead_code)]

use alloy_primitives::{address, Address, U256};
use allocation_guard::{
    ActionKind, AdapterCall, AdapterError, AllocationGuard, AllocationIntent, CallContext,
    EngineConfig, FactsError, GovernanceParams, MarketFacts, OracleFeeds, PriceReading,
    ProtocolAdapter, RiskLimits, Selector, SequencerStatus,
};
use intent_signer::{address_of, signed_envelope, signing_key_from_hex};
use k256::ecdsa::SigningKey;

pub const CHAIN_ID: u64 = 8453;
pub const NOW: u64 = 1_700_000_000;
pub const USDC: u64 = 1_000_000;
pub const DAY: u64 = 24 * 60 * 60;

pub const ADMIN: Address = address!("00000000000000000000000000000000000000a1");
pub const GUARDIAN_1: Address = address!("00000000000000000000000000000000000000b1");
pub const GUARDIAN_2: Address = address!("00000000000000000000000000000000000000b2");
pub const RELAYER: Address = address!("00000000000000000000000000000000000000e1");
pub const USER: Address = address!("00000000000000000000000000000000000000c1");
pub const POOL: Address = address!("00000000000000000000000000000000000000d1");
pub const FEED: Address = address!("00000000000000000000000000000000000000f1");
pub const SEQUENCER_FEED: Address = address!("00000000000000000000000000000000000000f2");

pub const APPROVE: Selector = [0x09, 0x5e, 0xa7, 0xb3];
pub const TRANSFER: Selector = [0xa9, 0x05, 0x9c, 0xbb];
pub const SUPPLY: Selector = [0x61, 0x7b, 0xa0, 0x37];
pub const WITHDRAW: Selector = [0x69, 0x32, 0x8d, 0xec];
/// ERC-4626 `deposit(uint256,address)`, registered on POOL as the rebalance entry.
pub const VAULT_DEPOSIT: Selector = [0x6e, 0x55, 0x3f, 0x65];

// Well-known development keys (anvil accounts #0 and #1).
const AGENT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const OTHER_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

pub fn agent_key() -> SigningKey {
    signing_key_from_hex(AGENT_KEY).unwrap()
}

pub fn other_key() -> SigningKey {
    signing_key_from_hex(OTHER_KEY).unwrap()
}

pub fn usdc(amount: u64) -> U256 {
    U256::from(amount) * U256::from(USDC)
}

/// Direct up to 700k, multisig above that, never above 950k in one action.
pub fn limits() -> RiskLimits {
    RiskLimits {
        max_tx_amount: 950_000 * USDC,
        daily_cap: 1_000_000 * USDC,
        large_transfer_threshold: 700_000 * USDC,
        default_concentration_cap_bps: 10_000,
        ..RiskLimits::default()
    }
}

/// A guard with USER whitelisted, RELAYER registered and POOL approved for
/// supply (deposit), withdraw and vault deposit (rebalance).
pub fn guard() -> AllocationGuard {
    guard_with(limits(), None)
}

pub fn guard_with(limits: RiskLimits, sequencer_feed: Option<Address>) -> AllocationGuard {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut guard = AllocationGuard::new(EngineConfig {
        chain_id: CHAIN_ID,
        admin: ADMIN,
        agent: address_of(&agent_key()),
        guardians: vec![GUARDIAN_1, GUARDIAN_2],
        relayers: vec![RELAYER],
        oracle: OracleFeeds { price_feed: FEED, sequencer_feed },
        limits,
        governance: GovernanceParams::default(),
    })
    .unwrap();

    let admin = ctx(ADMIN, NOW);
    guard.set_whitelist(&admin, USER, true).unwrap();
    guard.approve_protocol(&admin, POOL, true).unwrap();
    guard
        .set_allowed_selectors(
            &admin,
            POOL,
            [
                (SUPPLY, ActionKind::Deposit),
                (WITHDRAW, ActionKind::Withdraw),
                (VAULT_DEPOSIT, ActionKind::Rebalance),
            ],
        )
        .unwrap();
    guard.take_events();
    guard
}

pub fn ctx(sender: Address, timestamp: u64) -> CallContext {
    CallContext::new(sender, timestamp)
}

pub fn relay(timestamp: u64) -> CallContext {
    ctx(RELAYER, timestamp)
}

pub fn intent(amount_usdc: u64, nonce: u64) -> AllocationIntent {
    AllocationIntent {
        user: USER,
        protocol: POOL,
        amount: usdc(amount_usdc),
        min_amount_out: U256::ZERO,
        deadline: NOW + 600,
        nonce: U256::from(nonce),
        price_at_sign: U256::ZERO,
        chain_id: CHAIN_ID,
    }
}

pub fn envelope_with(intent: AllocationIntent, kind: ActionKind, selector: Selector, key: &SigningKey) -> Vec<u8> {
    signed_envelope(intent, kind, selector, key).unwrap().1
}

/// Agent-signed `supply` deposit.
pub fn deposit(intent: AllocationIntent) -> Vec<u8> {
    envelope_with(intent, ActionKind::Deposit, SUPPLY, &agent_key())
}

/// Agent-signed `withdraw`.
pub fn withdrawal(intent: AllocationIntent) -> Vec<u8> {
    envelope_with(intent, ActionKind::Withdraw, WITHDRAW, &agent_key())
}

/// Oracle and vault readings as seen at one block.
pub struct Facts {
    pub price: U256,
    pub updated_at: u64,
    pub total: U256,
    pub sequencer: SequencerStatus,
}

impl Facts {
    /// A healthy $1.00 reading published at `timestamp`, sequencer up for a day.
    pub fn at(timestamp: u64) -> Self {
        Self {
            price: U256::from(100_000_000u64),
            updated_at: timestamp,
            total: usdc(10_000_000),
            sequencer: SequencerStatus { is_up: true, status_since: timestamp - DAY },
        }
    }
}

impl MarketFacts for Facts {
    fn latest_price(&self, feed: Address) -> Result<PriceReading, FactsError> {
        if feed != FEED {
            return Err(FactsError::FeedUnavailable { feed });
        }
        Ok(PriceReading { price: self.price, decimals: 8, updated_at: self.updated_at })
    }

    fn sequencer_status(&self, feed: Address) -> Result<SequencerStatus, FactsError> {
        if feed != SEQUENCER_FEED {
            return Err(FactsError::FeedUnavailable { feed });
        }
        Ok(self.sequencer)
    }

    fn total_managed_assets(&self) -> Result<U256, FactsError> {
        Ok(self.total)
    }
}

/// Records every call; fails or under-delivers on request.
#[derive(Default)]
pub struct MockAdapter {
    pub calls: Vec<AdapterCall>,
    pub revert: bool,
    pub amount_out: Option<U256>,
}

impl MockAdapter {
    pub fn reverting() -> Self {
        Self { revert: true, ..Self::default() }
    }
}

impl ProtocolAdapter for MockAdapter {
    fn execute(&mut self, call: &AdapterCall) -> Result<U256, AdapterError> {
        self.calls.push(call.clone());
        if self.revert {
            return Err(AdapterError::new("pool paused"));
        }
        Ok(self.amount_out.unwrap_or(call.amount))
    }
}
