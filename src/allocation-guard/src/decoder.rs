use allocation_guard_types::{ActionKind, AllocationIntent, Submission, INTENT_PACKED_LEN};

use crate::{
    constants::{ENVELOPE_VERSION, SIGNATURE_LEN},
    errors::DecodeError,
    utils::bytes::{
        read_address, read_selector, read_slice, read_u16_be, read_u256_be, read_u64_word, read_u8,
    },
};

/// Minimum envelope size: header, packed intent, signature length prefix.
const MIN_ENVELOPE_LEN: usize = 2 + 1 + 4 + INTENT_PACKED_LEN + 2;

/// Parse a submission envelope.
///
/// Layout (big-endian):
/// - u16 version (must be 1)
/// - u8 action kind
/// - bytes4 selector
/// - packed intent (see [`AllocationIntent::encode_packed`])
/// - u16 sig_len (must be 65)
/// - bytes signature (r || s || v)
pub fn decode_submission(bytes: &[u8]) -> Result<Submission, DecodeError> {
    if bytes.len() < MIN_ENVELOPE_LEN {
        return Err(DecodeError::Truncated);
    }
    let mut i = 0usize;

    let version = read_u16_be(bytes, &mut i)?;
    if version != ENVELOPE_VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let kind_byte = read_u8(bytes, &mut i)?;
    let kind = ActionKind::try_from(kind_byte).map_err(|_| DecodeError::UnknownActionKind(kind_byte))?;
    let selector = read_selector(bytes, &mut i)?;
    let intent = decode_intent(bytes, &mut i)?;

    let sig_len = read_u16_be(bytes, &mut i)?;
    if sig_len as usize != SIGNATURE_LEN {
        return Err(DecodeError::BadSignatureLength(sig_len));
    }
    let mut signature = [0u8; SIGNATURE_LEN];
    signature.copy_from_slice(read_slice(bytes, &mut i, SIGNATURE_LEN)?);

    if i != bytes.len() {
        // reject trailing bytes for determinism
        return Err(DecodeError::TrailingBytes);
    }

    Ok(Submission {
        version,
        kind,
        selector,
        intent,
        signature,
    })
}

fn decode_intent(bytes: &[u8], i: &mut usize) -> Result<AllocationIntent, DecodeError> {
    Ok(AllocationIntent {
        user: read_address(bytes, i)?,
        protocol: read_address(bytes, i)?,
        amount: read_u256_be(bytes, i)?,
        min_amount_out: read_u256_be(bytes, i)?,
        deadline: read_u64_word(bytes, i)?,
        nonce: read_u256_be(bytes, i)?,
        price_at_sign: read_u256_be(bytes, i)?,
        chain_id: read_u64_word(bytes, i)?,
    })
}
