use std::collections::BTreeSet;

use alloy_primitives::{Address, U256};

use crate::errors::AuthError;

/// Per-user set of consumed nonces.
///
/// A set rather than a counter: nonces are caller-chosen so intents can be prepared in
/// parallel. Entries are never removed.
#[derive(Clone, Debug, Default)]
pub struct NonceLedger {
    consumed: BTreeSet<(Address, U256)>,
}

impl NonceLedger {
    pub fn is_consumed(&self, user: Address, nonce: U256) -> bool {
        self.consumed.contains(&(user, nonce))
    }

    /// Read-only half of [`Self::try_consume`], used while checks are still running.
    pub fn ensure_unused(&self, user: Address, nonce: U256) -> Result<(), AuthError> {
        if self.is_consumed(user, nonce) {
            return Err(AuthError::NonceAlreadyUsed { user, nonce });
        }
        Ok(())
    }

    pub fn try_consume(&mut self, user: Address, nonce: U256) -> Result<(), AuthError> {
        if !self.consumed.insert((user, nonce)) {
            return Err(AuthError::NonceAlreadyUsed { user, nonce });
        }
        Ok(())
    }
}
