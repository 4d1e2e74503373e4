use serde::{Deserialize, Serialize};

/// 4-byte function selector of a protocol call.
pub type Selector = [u8; 4];

/// Class of fund movement an intent performs against a protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ActionKind {
    Deposit = 0x01,
    Rebalance = 0x02,
    Withdraw = 0x03,
}

impl ActionKind {
    /// Whether the action moves funds *into* the target protocol.
    pub fn adds_exposure(self) -> bool {
        matches!(self, ActionKind::Deposit | ActionKind::Rebalance)
    }

    pub fn is_rebalance(self) -> bool {
        self == ActionKind::Rebalance
    }
}

impl TryFrom<u8> for ActionKind {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let kind = match value {
            0x01 => ActionKind::Deposit,
            0x02 => ActionKind::Rebalance,
            0x03 => ActionKind::Withdraw,
            _ => return Err(()),
        };
        Ok(kind)
    }
}

impl core::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deposit" => Ok(ActionKind::Deposit),
            "rebalance" => Ok(ActionKind::Rebalance),
            "withdraw" => Ok(ActionKind::Withdraw),
            other => Err(format!("unknown action kind `{other}`")),
        }
    }
}
