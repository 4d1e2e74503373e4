use std::path::Path;

use alloy_primitives::{Address, B256};
use allocation_guard_types::{ActionKind, AllocationIntent, Selector, Submission};
use anyhow::{anyhow, Context, Result};
use k256::ecdsa::{RecoveryId, SigningKey};

use crate::encoder::{encode_submission, eth_signed_message_hash, intent_digest, keccak256_bytes, ENVELOPE_VERSION};

/// An intent signature in the canonical form the engine accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedIntent {
    /// keccak256 of the packed intent (before the personal-message prefix).
    pub digest: B256,
    /// r || s || v with low s and v in {27, 28}.
    pub signature: [u8; 65],
    pub signer: Address,
}

/// Parse a hex private key, with or without `0x`.
pub fn signing_key_from_hex(raw: &str) -> Result<SigningKey> {
    let raw = raw.trim();
    let bytes = hex::decode(raw.strip_prefix("0x").unwrap_or(raw)).context("private key is not valid hex")?;
    if bytes.len() != 32 {
        return Err(anyhow!("private key must be 32 bytes, got {}", bytes.len()));
    }
    SigningKey::from_slice(&bytes).map_err(|_| anyhow!("private key is not a valid secp256k1 scalar"))
}

pub fn signing_key_from_file(path: &Path) -> Result<SigningKey> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    signing_key_from_hex(&raw)
}

/// Ethereum address of a signing key.
pub fn address_of(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256_bytes(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Sign the intent digest as a personal message.
pub fn sign_intent(intent: &AllocationIntent, key: &SigningKey) -> Result<SignedIntent, k256::ecdsa::Error> {
    let digest = intent_digest(intent);
    let hash = eth_signed_message_hash(digest);
    let (mut signature, mut recovery_id) = key.sign_prehash_recoverable(hash.as_slice())?;

    // The engine rejects high-s signatures; flip to the low-s twin and its recovery id.
    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        recovery_id = RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced());
    }

    let mut sig = [0u8; 65];
    sig[..64].copy_from_slice(&signature.to_bytes());
    sig[64] = 27 + recovery_id.to_byte();
    Ok(SignedIntent {
        digest,
        signature: sig,
        signer: address_of(key),
    })
}

/// Sign `intent` and wrap it in a ready-to-relay submission envelope.
pub fn signed_envelope(
    intent: AllocationIntent,
    kind: ActionKind,
    selector: Selector,
    key: &SigningKey,
) -> Result<(SignedIntent, Vec<u8>), k256::ecdsa::Error> {
    let signed = sign_intent(&intent, key)?;
    let envelope = encode_submission(&Submission {
        version: ENVELOPE_VERSION,
        kind,
        selector,
        intent,
        signature: signed.signature,
    });
    Ok((signed, envelope))
}
