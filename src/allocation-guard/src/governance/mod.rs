//! Escalation paths that bound what a single compromised signer can do.
//!
//! - [`multisig`]: oversized allocations wait for a quorum of Admin/Guardian approvals.
//! - [`timelock`]: privileged configuration changes wait out a fixed delay.

pub mod multisig;
pub mod timelock;

pub use multisig::{MultisigBook, MultisigProposal};
pub use timelock::{PrivilegedChange, Timelock, TimelockEntry};
