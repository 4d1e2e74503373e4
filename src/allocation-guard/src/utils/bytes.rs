//! Minimal big-endian parsing helpers for the submission envelope.

use alloy_primitives::{Address, U256};

use crate::errors::DecodeError;

pub fn read_slice<'a>(bytes: &'a [u8], i: &mut usize, len: usize) -> Result<&'a [u8], DecodeError> {
    let end = i.checked_add(len).ok_or(DecodeError::Truncated)?;
    if bytes.len() < end {
        return Err(DecodeError::Truncated);
    }
    let out = &bytes[*i..end];
    *i = end;
    Ok(out)
}

pub fn read_u8(bytes: &[u8], i: &mut usize) -> Result<u8, DecodeError> {
    Ok(read_slice(bytes, i, 1)?[0])
}

pub fn read_u16_be(bytes: &[u8], i: &mut usize) -> Result<u16, DecodeError> {
    let mut buf = [0u8; 2];
    buf.copy_from_slice(read_slice(bytes, i, 2)?);
    Ok(u16::from_be_bytes(buf))
}

pub fn read_selector(bytes: &[u8], i: &mut usize) -> Result<[u8; 4], DecodeError> {
    let mut sel = [0u8; 4];
    sel.copy_from_slice(read_slice(bytes, i, 4)?);
    Ok(sel)
}

pub fn read_address(bytes: &[u8], i: &mut usize) -> Result<Address, DecodeError> {
    Ok(Address::from_slice(read_slice(bytes, i, 20)?))
}

pub fn read_u256_be(bytes: &[u8], i: &mut usize) -> Result<U256, DecodeError> {
    Ok(U256::from_be_slice(read_slice(bytes, i, 32)?))
}

/// A uint256 word that must fit in a u64 (timestamps, chain ids).
///
/// Values that do not fit saturate to `u64::MAX`. The digest recomputed from a saturated
/// field no longer matches what was signed, so such envelopes fail signature verification.
pub fn read_u64_word(bytes: &[u8], i: &mut usize) -> Result<u64, DecodeError> {
    let word = read_u256_be(bytes, i)?;
    if word > U256::from(u64::MAX) {
        Ok(u64::MAX)
    } else {
        Ok(word.to::<u64>())
    }
}
