use alloy_primitives::B256;
use allocation_guard_types::{AllocationIntent, Submission, PERSONAL_MESSAGE_PREFIX};
use sha3::{Digest, Keccak256};

/// Envelope version understood by the engine's decoder.
pub const ENVELOPE_VERSION: u16 = 1;

pub(crate) fn keccak256_bytes(bytes: &[u8]) -> B256 {
    let mut h = Keccak256::new();
    h.update(bytes);
    let out = h.finalize();
    let mut b = [0u8; 32];
    b.copy_from_slice(out.as_slice());
    B256::from(b)
}

/// Compute the intent digest (must match the engine's `AllocationIntent::digest`).
pub fn intent_digest(intent: &AllocationIntent) -> B256 {
    keccak256_bytes(&intent.encode_packed())
}

/// Wrap a digest in the personal-message prefix; this is the hash that actually gets signed.
pub fn eth_signed_message_hash(digest: B256) -> B256 {
    let mut buf = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 32);
    buf.extend_from_slice(PERSONAL_MESSAGE_PREFIX);
    buf.extend_from_slice(digest.as_slice());
    keccak256_bytes(&buf)
}

/// Encode a submission envelope for relaying to the engine.
pub fn encode_submission(submission: &Submission) -> Vec<u8> {
    let intent = submission.intent.encode_packed();
    let mut buf = Vec::with_capacity(2 + 1 + 4 + intent.len() + 2 + submission.signature.len());

    // u16 version
    buf.extend_from_slice(&submission.version.to_be_bytes());

    // u8 action kind
    buf.push(submission.kind as u8);

    // bytes4 selector
    buf.extend_from_slice(&submission.selector);

    // packed intent
    buf.extend_from_slice(&intent);

    // u16 sig_len (65)
    buf.extend_from_slice(&(submission.signature.len() as u16).to_be_bytes());
    // bytes signature (r||s||v)
    buf.extend_from_slice(&submission.signature);

    buf
}
