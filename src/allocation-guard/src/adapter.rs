//! Seam to the protocol-specific call encoders that actually move funds.

use alloy_primitives::{Address, U256};
use allocation_guard_types::{ActionKind, Selector};

/// The call the engine asks an adapter to perform once every check has passed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterCall {
    pub user: Address,
    pub protocol: Address,
    pub selector: Selector,
    pub kind: ActionKind,
    pub amount: U256,
    pub min_amount_out: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct AdapterError {
    pub reason: String,
}

impl AdapterError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Executes an authorised call against the target protocol.
///
/// Returns the amount received (shares, aTokens, withdrawn assets) so the engine can enforce
/// `minAmountOut`.
pub trait ProtocolAdapter {
    fn execute(&mut self, call: &AdapterCall) -> Result<U256, AdapterError>;
}
