//! Authorization and risk-control engine for agent-driven stable-asset allocations.
//!
//! An off-chain agent signs [`AllocationIntent`]s; a relayer submits them wrapped in a
//! versioned envelope. [`AllocationGuard::submit`] accepts an action only when the agent's
//! signature, the user and protocol registries, the replay ledger and every risk limit agree.
//! Large amounts escalate to a multisig; privileged changes that widen the agent's reach wait
//! out a timelock.

pub mod abi;
pub mod adapter;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod events;
pub mod governance;
pub mod nonce;
pub mod registry;
pub mod utils;

pub use adapter::{AdapterCall, AdapterError, ProtocolAdapter};
pub use allocation_guard_types::{
    ActionKind, AllocationIntent, FactsError, MarketFacts, PriceReading, Role, Selector,
    SequencerStatus, Submission,
};
pub use config::{EngineConfig, GovernanceParams, OracleFeeds, RiskLimits};
pub use engine::{AllocationGuard, CallContext, ChangeOutcome, SubmitOutcome};
pub use errors::{AuthError, ConfigError, DecodeError, ExecutionFailure};
pub use events::EngineEvent;
