use std::collections::BTreeMap;

use alloy_primitives::Address;

use crate::{
    config::{GovernanceParams, OracleFeeds, RiskLimits},
    errors::AuthError,
};

/// Configuration changes that must wait out the timelock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrivilegedChange {
    SetAgent(Address),
    SetAdmin(Address),
    /// Only scheduled when the new limits loosen the current ones.
    SetLimits(RiskLimits),
    SetOracle(OracleFeeds),
    /// Raising a protocol's concentration cap.
    SetConcentrationCap { protocol: Address, cap_bps: u16 },
    SetGovernance(GovernanceParams),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelockEntry {
    pub id: u64,
    pub change: PrivilegedChange,
    pub proposed_at: u64,
    pub executable_after: u64,
    pub executed: bool,
}

/// Scheduled privileged changes, keyed by a monotonically increasing id.
#[derive(Clone, Debug, Default)]
pub struct Timelock {
    next_id: u64,
    entries: BTreeMap<u64, TimelockEntry>,
}

impl Timelock {
    pub fn schedule(&mut self, change: PrivilegedChange, now: u64, delay_secs: u64) -> &TimelockEntry {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.entry(id).or_insert(TimelockEntry {
            id,
            change,
            proposed_at: now,
            executable_after: now.saturating_add(delay_secs),
            executed: false,
        })
    }

    /// Mark entry `id` executed and hand back its change, if its delay has elapsed.
    pub fn take_ready(&mut self, id: u64, now: u64) -> Result<PrivilegedChange, AuthError> {
        let entry = self.entries.get_mut(&id).ok_or(AuthError::TimelockNotFound(id))?;
        if entry.executed {
            return Err(AuthError::AlreadyExecuted);
        }
        if now < entry.executable_after {
            return Err(AuthError::TimelockNotElapsed {
                executable_after: entry.executable_after,
            });
        }
        entry.executed = true;
        Ok(entry.change.clone())
    }

    /// Drop a pending entry. Executed entries stay on record and cannot be cancelled.
    pub fn cancel(&mut self, id: u64) -> Result<TimelockEntry, AuthError> {
        match self.entries.get(&id) {
            None => Err(AuthError::TimelockNotFound(id)),
            Some(entry) if entry.executed => Err(AuthError::AlreadyExecuted),
            Some(_) => self.entries.remove(&id).ok_or(AuthError::TimelockNotFound(id)),
        }
    }

    pub fn get(&self, id: u64) -> Option<&TimelockEntry> {
        self.entries.get(&id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &TimelockEntry> {
        self.entries.values().filter(|entry| !entry.executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    const NEW_AGENT: Address = address!("00000000000000000000000000000000000000a9");

    #[test]
    fn executes_only_after_delay() {
        let mut timelock = Timelock::default();
        let id = timelock.schedule(PrivilegedChange::SetAgent(NEW_AGENT), 1_000, 172_800).id;

        assert_eq!(
            timelock.take_ready(id, 1_000 + 172_799),
            Err(AuthError::TimelockNotElapsed { executable_after: 173_800 })
        );
        assert_eq!(
            timelock.take_ready(id, 173_800),
            Ok(PrivilegedChange::SetAgent(NEW_AGENT))
        );
        assert_eq!(timelock.take_ready(id, 173_801), Err(AuthError::AlreadyExecuted));
        assert_eq!(timelock.cancel(id), Err(AuthError::AlreadyExecuted));
    }

    #[test]
    fn cancelled_entries_disappear() {
        let mut timelock = Timelock::default();
        let feeds = OracleFeeds { price_feed: NEW_AGENT, sequencer_feed: None };
        let first = timelock.schedule(PrivilegedChange::SetOracle(feeds), 0, 10).id;
        let second = timelock.schedule(PrivilegedChange::SetAdmin(NEW_AGENT), 0, 10).id;
        assert_ne!(first, second);

        timelock.cancel(first).unwrap();
        assert_eq!(timelock.take_ready(first, 100), Err(AuthError::TimelockNotFound(first)));
        assert_eq!(timelock.pending().count(), 1);
    }
}
