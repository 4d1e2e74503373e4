//! Off-chain counterpart of the allocation guard: signs intents the way the engine verifies them
//! and encodes submission envelopes for relaying.

pub mod encoder;
pub mod signer;


pub use encoder::{encode_submission, eth_signed_message_hash, intent_digest, ENVELOPE_VERSION};
pub use signer::{
    address_of, sign_intent, signed_envelope, signing_key_from_file, signing_key_from_hex,
    SignedIntent,
};
