use crate::{action::ActionKind, action::Selector, intent::AllocationIntent};

/// A signed intent as relayed to the on-chain entry point.
///
/// `kind` and `selector` travel next to the intent: they name the adapter call the relay wants
/// executed and are checked against the registry, while the signature covers the intent itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub version: u16,
    pub kind: ActionKind,
    pub selector: Selector,
    pub intent: AllocationIntent,
    /// r || s || v over the personal-message hash of the intent digest.
    pub signature: [u8; 65],
}
