use alloy_primitives::{Address, U256};
use allocation_guard_types::{ActionKind, Selector};

/// Errors while decoding a submission envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u16),
    #[error("unknown action kind {0:#04x}")]
    UnknownActionKind(u8),
    #[error("signature length must be 65, got {0}")]
    BadSignatureLength(u16),
    #[error("envelope truncated")]
    Truncated,
    #[error("trailing bytes after signature")]
    TrailingBytes,
}

/// Why an accepted action did not complete at the protocol adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionFailure {
    #[error("protocol call reverted: {0}")]
    Reverted(String),
    #[error("received {received} below minAmountOut {min}")]
    SlippageExceeded { min: U256, received: U256 },
}

/// Every way the engine can refuse an action or an admin call.
///
/// Checks fail closed: each rejection surfaces one of these verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("user {user} is not whitelisted")]
    NotWhitelisted { user: Address },
    #[error("protocol {protocol} is not approved")]
    ProtocolNotApproved { protocol: Address },
    #[error("selector 0x{} is not allowed on {protocol}", hex::encode(.selector))]
    SelectorNotAllowed { protocol: Address, selector: Selector },
    #[error("selector 0x{} performs {registered:?}, envelope declared {declared:?}", hex::encode(.selector))]
    ActionKindMismatch { selector: Selector, declared: ActionKind, registered: ActionKind },
    #[error("invalid signature")]
    InvalidSignature,
    #[error("nonce {nonce} already used by {user}")]
    NonceAlreadyUsed { user: Address, nonce: U256 },
    #[error("intent expired")]
    IntentExpired,
    #[error("intent bound to chain {got}, expected {expected}")]
    WrongChain { expected: u64, got: u64 },
    #[error("stable asset is off its peg")]
    AssetDepegged,
    #[error("price moved beyond tolerance since signing")]
    PriceMovedSinceSign,
    #[error("amount exceeds per-transaction cap")]
    AmountExceedsTxCap,
    #[error("daily cap exceeded")]
    DailyCapExceeded,
    #[error("protocol concentration cap exceeded")]
    ProtocolCapExceeded,
    #[error("rebalance cool-down active")]
    RebalanceCooldown,
    #[error("circuit breaker open")]
    CircuitBreakerOpen,
    #[error("oracle data stale or unavailable")]
    OracleStale,
    #[error("sequencer down or inside grace period")]
    SequencerDown,
    #[error("insufficient approvals: {approvals}/{required}")]
    InsufficientApprovals { approvals: u32, required: u32 },
    #[error("timelock not elapsed (executable after {executable_after})")]
    TimelockNotElapsed { executable_after: u64 },
    #[error("timelock entry {0} not found")]
    TimelockNotFound(u64),
    #[error("proposal not found")]
    ProposalNotFound,
    #[error("already executed")]
    AlreadyExecuted,
    #[error("caller {caller} lacks the required role")]
    Unauthorized { caller: Address },
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("malformed submission: {0}")]
    MalformedSubmission(#[from] DecodeError),
    #[error("execution failed: {0}")]
    ExecutionFailed(#[from] ExecutionFailure),
}

/// Errors while loading engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}
