use serde::{Deserialize, Serialize};

/// Principal roles recognised by the wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Configures whitelist, protocols and limits. Singleton, changed only via timelock.
    Admin,
    /// Off-chain signer whose signatures authorise allocation intents. Singleton.
    Agent,
    /// May trigger/clear the emergency pause and approve multisig proposals.
    Guardian,
}
