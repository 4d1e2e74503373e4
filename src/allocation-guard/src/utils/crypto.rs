//! Signer recovery for authorised intents.
//!
//! Mirrors the EVM `ecrecover` precompile but only accepts the canonical signature form:
//! low `s` and `v` in {27, 28}. Every other encoding of the same signature is rejected so a
//! signature has exactly one valid byte representation.

use alloy_primitives::{keccak256, Address, B256};
use k256::{
    ecdsa::{RecoveryId, Signature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};

/// Why signer recovery refused a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverError {
    /// `v` outside {27, 28}.
    NonCanonicalV(u8),
    /// `s` in the upper half of the curve order.
    HighS,
    /// `r` or `s` out of range.
    Malformed,
    /// No public key recovers from this (hash, signature) pair.
    NoKey,
}

/// Recover the EOA address that produced `sig` (r || s || v) over `hash`.
pub fn ecrecover_address(hash: B256, sig: &[u8; 65]) -> Result<Address, RecoverError> {
    let v = sig[64];
    let recid = match v {
        27 | 28 => RecoveryId::from_byte(v - 27).ok_or(RecoverError::NonCanonicalV(v))?,
        _ => return Err(RecoverError::NonCanonicalV(v)),
    };
    let signature = Signature::from_slice(&sig[..64]).map_err(|_| RecoverError::Malformed)?;
    if signature.normalize_s().is_some() {
        return Err(RecoverError::HighS);
    }
    let key = VerifyingKey::recover_from_prehash(hash.as_slice(), &signature, recid)
        .map_err(|_| RecoverError::NoKey)?;
    Ok(address_of(&key))
}

/// Ethereum address of a secp256k1 public key: low 20 bytes of keccak256(X || Y).
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}
