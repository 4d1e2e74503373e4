use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, B256};
use allocation_guard_types::Submission;

use crate::errors::AuthError;

/// An escalated action waiting for approvals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultisigProposal {
    /// keccak256 of the submission envelope.
    pub action_hash: B256,
    pub submission: Submission,
    pub required_approvals: u32,
    pub approvals: BTreeSet<Address>,
    pub created_at: u64,
    pub executed: bool,
}

impl MultisigProposal {
    pub fn approval_count(&self) -> u32 {
        u32::try_from(self.approvals.len()).unwrap_or(u32::MAX)
    }

    pub fn has_quorum(&self) -> bool {
        self.approval_count() >= self.required_approvals
    }
}

#[derive(Clone, Debug, Default)]
pub struct MultisigBook {
    proposals: BTreeMap<B256, MultisigProposal>,
}

impl MultisigBook {
    /// Open a proposal for `action_hash`, or return the existing one.
    ///
    /// The bool is true when a new proposal was created.
    pub fn open(
        &mut self,
        action_hash: B256,
        submission: &Submission,
        required_approvals: u32,
        now: u64,
    ) -> (&MultisigProposal, bool) {
        let mut created = false;
        let proposal = self.proposals.entry(action_hash).or_insert_with(|| {
            created = true;
            MultisigProposal {
                action_hash,
                submission: submission.clone(),
                required_approvals,
                approvals: BTreeSet::new(),
                created_at: now,
                executed: false,
            }
        });
        (&*proposal, created)
    }

    /// Record an approval. Repeat approvals by the same signer are no-ops (returns false).
    pub fn approve(&mut self, action_hash: B256, approver: Address) -> Result<bool, AuthError> {
        let proposal = self
            .proposals
            .get_mut(&action_hash)
            .ok_or(AuthError::ProposalNotFound)?;
        if proposal.executed {
            return Err(AuthError::AlreadyExecuted);
        }
        Ok(proposal.approvals.insert(approver))
    }

    /// The proposal's submission, if it has reached quorum and has not run yet.
    pub fn ready(&self, action_hash: B256) -> Result<&MultisigProposal, AuthError> {
        let proposal = self
            .proposals
            .get(&action_hash)
            .ok_or(AuthError::ProposalNotFound)?;
        if proposal.executed {
            return Err(AuthError::AlreadyExecuted);
        }
        if !proposal.has_quorum() {
            return Err(AuthError::InsufficientApprovals {
                approvals: proposal.approval_count(),
                required: proposal.required_approvals,
            });
        }
        Ok(proposal)
    }

    pub fn mark_executed(&mut self, action_hash: B256) {
        if let Some(proposal) = self.proposals.get_mut(&action_hash) {
            proposal.executed = true;
        }
    }

    /// Drop every proposal whose intent deadline has passed, executed or not.
    ///
    /// An expired intent can never run again, so its proposal is dead weight. Returns the
    /// hashes removed.
    pub fn prune_expired(&mut self, now: u64) -> Vec<B256> {
        let expired: Vec<B256> = self
            .proposals
            .values()
            .filter(|p| now > p.submission.intent.deadline)
            .map(|p| p.action_hash)
            .collect();
        for hash in &expired {
            self.proposals.remove(hash);
        }
        expired
    }

    /// Proposals still on the book, executed ones included.
    pub fn count(&self) -> usize {
        self.proposals.len()
    }

    pub fn get(&self, action_hash: B256) -> Option<&MultisigProposal> {
        self.proposals.get(&action_hash)
    }
}
