//! Small deterministic helpers shared by the decoder and the verifier.

pub mod bytes;
pub mod crypto;
