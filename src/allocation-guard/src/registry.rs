//! Principals, whitelisted users and approved protocols.
//!
//! The registry only answers questions and records changes; who may change what is decided by
//! the engine through [`Registry::require_role`].

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::Address;
use allocation_guard_types::{ActionKind, Role, Selector};

use crate::errors::AuthError;

/// An approved (or previously approved) protocol and the calls it may receive.
///
/// Each allowed selector is classified with the [`ActionKind`] it performs; the risk engine
/// trusts this classification, never the kind a relayer declares.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProtocolRecord {
    pub approved: bool,
    pub allowed_selectors: BTreeMap<Selector, ActionKind>,
    pub is_lending_protocol: bool,
    pub concentration_cap_bps: u16,
}

impl ProtocolRecord {
    pub fn kind_of(&self, selector: Selector) -> Option<ActionKind> {
        self.allowed_selectors.get(&selector).copied()
    }
}

#[derive(Clone, Debug)]
pub struct Registry {
    admin: Address,
    agent: Address,
    guardians: BTreeSet<Address>,
    relayers: BTreeSet<Address>,
    whitelist: BTreeSet<Address>,
    protocols: BTreeMap<Address, ProtocolRecord>,
}

impl Registry {
    pub fn new(admin: Address, agent: Address, guardians: impl IntoIterator<Item = Address>) -> Self {
        Self {
            admin,
            agent,
            guardians: guardians.into_iter().collect(),
            relayers: BTreeSet::new(),
            whitelist: BTreeSet::new(),
            protocols: BTreeMap::new(),
        }
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn agent(&self) -> Address {
        self.agent
    }

    pub fn has_role(&self, who: Address, role: Role) -> bool {
        match role {
            Role::Admin => who == self.admin,
            Role::Agent => who == self.agent,
            Role::Guardian => self.guardians.contains(&who),
        }
    }

    /// Capability check: `caller` must hold at least one of `roles`.
    pub fn require_role(&self, caller: Address, roles: &[Role]) -> Result<(), AuthError> {
        if roles.iter().any(|role| self.has_role(caller, *role)) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized { caller })
        }
    }

    pub fn is_relayer(&self, who: Address) -> bool {
        self.relayers.contains(&who)
    }

    /// Only the agent itself or a registered relayer may hand the engine a submission.
    pub fn require_submitter(&self, caller: Address) -> Result<(), AuthError> {
        if caller == self.agent || self.is_relayer(caller) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized { caller })
        }
    }

    pub fn is_whitelisted(&self, user: Address) -> bool {
        self.whitelist.contains(&user)
    }

    pub fn is_approved(&self, protocol: Address) -> bool {
        self.protocols.get(&protocol).is_some_and(|p| p.approved)
    }

    pub fn is_selector_allowed(&self, protocol: Address, selector: Selector) -> bool {
        self.protocols
            .get(&protocol)
            .is_some_and(|p| p.allowed_selectors.contains_key(&selector))
    }

    pub fn protocol(&self, protocol: Address) -> Option<&ProtocolRecord> {
        self.protocols.get(&protocol)
    }

    /// Whitelist, approval and selector gates, in that order.
    ///
    /// Returns the protocol record and the action kind registered for `selector`.
    pub fn check_target(
        &self,
        user: Address,
        protocol: Address,
        selector: Selector,
    ) -> Result<(&ProtocolRecord, ActionKind), AuthError> {
        if !self.is_whitelisted(user) {
            return Err(AuthError::NotWhitelisted { user });
        }
        let record = match self.protocols.get(&protocol) {
            Some(record) if record.approved => record,
            _ => return Err(AuthError::ProtocolNotApproved { protocol }),
        };
        let Some(kind) = record.kind_of(selector) else {
            return Err(AuthError::SelectorNotAllowed { protocol, selector });
        };
        Ok((record, kind))
    }

    pub(crate) fn set_whitelist(&mut self, user: Address, whitelisted: bool) {
        if whitelisted {
            self.whitelist.insert(user);
        } else {
            self.whitelist.remove(&user);
        }
    }

    /// Records persist after de-approval so selectors and caps survive a re-approval.
    pub(crate) fn set_approved(&mut self, protocol: Address, approved: bool, default_cap_bps: u16) {
        let record = self
            .protocols
            .entry(protocol)
            .or_insert_with(|| ProtocolRecord {
                concentration_cap_bps: default_cap_bps,
                ..ProtocolRecord::default()
            });
        record.approved = approved;
    }

    pub(crate) fn set_allowed_selectors(
        &mut self,
        protocol: Address,
        selectors: BTreeMap<Selector, ActionKind>,
        default_cap_bps: u16,
    ) {
        self.record_mut(protocol, default_cap_bps).allowed_selectors = selectors;
    }

    pub(crate) fn set_lending_flag(&mut self, protocol: Address, is_lending: bool, default_cap_bps: u16) {
        self.record_mut(protocol, default_cap_bps).is_lending_protocol = is_lending;
    }

    pub(crate) fn set_concentration_cap(&mut self, protocol: Address, cap_bps: u16, default_cap_bps: u16) {
        self.record_mut(protocol, default_cap_bps).concentration_cap_bps = cap_bps;
    }

    pub(crate) fn set_guardian(&mut self, guardian: Address, active: bool) {
        if active {
            self.guardians.insert(guardian);
        } else {
            self.guardians.remove(&guardian);
        }
    }

    pub(crate) fn set_relayer(&mut self, relayer: Address, active: bool) {
        if active {
            self.relayers.insert(relayer);
        } else {
            self.relayers.remove(&relayer);
        }
    }

    pub(crate) fn set_agent(&mut self, agent: Address) -> Address {
        core::mem::replace(&mut self.agent, agent)
    }

    pub(crate) fn set_admin(&mut self, admin: Address) -> Address {
        core::mem::replace(&mut self.admin, admin)
    }

    fn record_mut(&mut self, protocol: Address, default_cap_bps: u16) -> &mut ProtocolRecord {
        self.protocols.entry(protocol).or_insert_with(|| ProtocolRecord {
            concentration_cap_bps: default_cap_bps,
            ..ProtocolRecord::default()
        })
    }
}
