use alloy_primitives::{keccak256, Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Length of [`AllocationIntent::encode_packed`]: two addresses followed by six 32-byte words.
pub const INTENT_PACKED_LEN: usize = 20 + 20 + 32 * 6;

/// Personal-message prefix for a 32-byte payload (EIP-191 version `0x45`).
pub const PERSONAL_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// A fully specified, unexecuted proposal to move funds on behalf of `user`.
///
/// Identified uniquely by `(user, nonce)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationIntent {
    pub user: Address,
    pub protocol: Address,
    pub amount: U256,
    pub min_amount_out: U256,
    /// Unix timestamp after which the intent can no longer be executed.
    pub deadline: u64,
    /// Caller-chosen replay nonce; need not be sequential.
    pub nonce: U256,
    /// Oracle price snapshot at signing time (feed units). Zero means "not recorded".
    pub price_at_sign: U256,
    pub chain_id: u64,
}

impl AllocationIntent {
    /// Tight encoding hashed by both signer and verifier.
    ///
    /// Layout (big-endian, no padding between fields):
    /// - bytes20 user
    /// - bytes20 protocol
    /// - uint256 amount
    /// - uint256 minAmountOut
    /// - uint256 deadline
    /// - uint256 nonce
    /// - uint256 priceAtSign
    /// - uint256 chainId
    ///
    /// Changing the order or any width is a wire-format break and needs a new envelope version.
    pub fn encode_packed(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(INTENT_PACKED_LEN);
        buf.extend_from_slice(self.user.as_slice());
        buf.extend_from_slice(self.protocol.as_slice());
        buf.extend_from_slice(&self.amount.to_be_bytes::<32>());
        buf.extend_from_slice(&self.min_amount_out.to_be_bytes::<32>());
        buf.extend_from_slice(&U256::from(self.deadline).to_be_bytes::<32>());
        buf.extend_from_slice(&self.nonce.to_be_bytes::<32>());
        buf.extend_from_slice(&self.price_at_sign.to_be_bytes::<32>());
        buf.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        buf
    }

    /// keccak256 of the packed encoding.
    pub fn digest(&self) -> B256 {
        keccak256(self.encode_packed())
    }

    /// The hash that is actually signed: the digest behind the personal-message prefix.
    pub fn signing_hash(&self) -> B256 {
        personal_message_hash(self.digest())
    }
}

/// keccak256(PERSONAL_MESSAGE_PREFIX || digest).
///
/// Keeps a signed intent from ever being mistaken for a raw transaction hash.
pub fn personal_message_hash(digest: B256) -> B256 {
    let mut buf = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 32);
    buf.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    buf.extend_from_slice(digest.as_slice());
    keccak256(buf)
}
