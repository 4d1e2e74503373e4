//! Types shared between the on-chain allocation guard and off-chain tooling.
//!
//! Anything that participates in the signed wire format lives here so the signer and the
//! verifier cannot drift apart.

pub mod action;
pub mod facts;
pub mod intent;
pub mod roles;
pub mod submission;

pub use action::{ActionKind, Selector};
pub use facts::{FactsError, MarketFacts, PriceReading, SequencerStatus};
pub use intent::{personal_message_hash, AllocationIntent, INTENT_PACKED_LEN, PERSONAL_MESSAGE_PREFIX};
pub use roles::Role;
pub use submission::Submission;
