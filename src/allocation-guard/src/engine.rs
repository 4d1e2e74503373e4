//! Allocation guard: the single entry point for agent-signed allocation actions.
//!
//! Design notes:
//! - The agent's signature is the "who"; whitelist, approvals and risk limits are the "when".
//! - Checks run read-only and in a fixed order. Only after every check passes is the nonce
//!   consumed and the protocol adapter called; risk counters are committed only on success.
//! - Anything that would widen what the agent may do goes through the timelock. Tightening and
//!   emergency stops apply immediately.

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, B256, U256};
use allocation_guard_types::{
    personal_message_hash, ActionKind, AllocationIntent, MarketFacts, Role, Selector, Submission,
};
use tracing::{debug, info, warn};

use crate::{
    abi,
    adapter::{AdapterCall, ProtocolAdapter},
    config::{EngineConfig, GovernanceParams, OracleFeeds, RiskLimits},
    constants::BPS_DENOMINATOR,
    decoder::decode_submission,
    errors::{AuthError, ConfigError, ExecutionFailure},
    evaluator::{evaluate, Authority, RiskDecision, RiskInputs, RiskState},
    events::EngineEvent,
    governance::{MultisigBook, MultisigProposal, PrivilegedChange, Timelock, TimelockEntry},
    nonce::NonceLedger,
    registry::Registry,
    utils::crypto::ecrecover_address,
};

/// Caller identity and block time for one engine call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub sender: Address,
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(sender: Address, timestamp: u64) -> Self {
        Self { sender, timestamp }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The protocol call ran and every counter was committed.
    Executed { digest: B256, amount_out: U256 },
    /// Above the large-transfer threshold; waiting on the multisig.
    PendingApproval { action_hash: B256, approvals: u32, required: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeOutcome {
    Applied,
    Scheduled { id: u64, executable_after: u64 },
}

pub struct AllocationGuard {
    chain_id: u64,
    limits: RiskLimits,
    governance: GovernanceParams,
    oracle: OracleFeeds,
    registry: Registry,
    nonces: NonceLedger,
    risk: RiskState,
    multisig: MultisigBook,
    timelock: Timelock,
    events: Vec<EngineEvent>,
}

impl AllocationGuard {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut registry = Registry::new(config.admin, config.agent, config.guardians);
        for relayer in config.relayers {
            registry.set_relayer(relayer, true);
        }
        info!(
            chain_id = config.chain_id,
            admin = %registry.admin(),
            agent = %registry.agent(),
            "allocation guard initialised"
        );
        Ok(Self {
            chain_id: config.chain_id,
            limits: config.limits,
            governance: config.governance,
            oracle: config.oracle,
            registry,
            nonces: NonceLedger::default(),
            risk: RiskState::default(),
            multisig: MultisigBook::default(),
            timelock: Timelock::default(),
            events: Vec::new(),
        })
    }

    // ---------------------------------------------------------------------
    // Actions
    // ---------------------------------------------------------------------

    /// Validate and, if every check passes, execute a signed submission envelope.
    ///
    /// Only the agent or a registered relayer may submit. Amounts above the large-transfer
    /// threshold are not executed; they open (or join) a multisig proposal keyed by the envelope
    /// hash and return [`SubmitOutcome::PendingApproval`].
    pub fn submit<F: MarketFacts, A: ProtocolAdapter>(
        &mut self,
        ctx: &CallContext,
        payload: &[u8],
        facts: &F,
        adapter: &mut A,
    ) -> Result<SubmitOutcome, AuthError> {
        self.registry.require_submitter(ctx.sender).inspect_err(|_| {
            warn!(caller = %ctx.sender, "submission from unregistered relayer");
        })?;
        let submission = decode_submission(payload).inspect_err(|err| {
            warn!(relayer = %ctx.sender, %err, "malformed submission");
        })?;
        let action_hash = keccak256(payload);
        self.process(ctx, &submission, action_hash, Authority::SingleSigner, facts, adapter)
            .inspect_err(|err| log_rejection(&submission.intent, err))
    }

    /// Add the caller's approval to an escalated action; returns the approval count.
    pub fn approve_proposal(&mut self, ctx: &CallContext, action_hash: B256) -> Result<u32, AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin, Role::Guardian])?;
        self.expire_proposals(ctx.timestamp);
        let added = self.multisig.approve(action_hash, ctx.sender)?;
        let approvals = self
            .multisig
            .get(action_hash)
            .map(MultisigProposal::approval_count)
            .unwrap_or_default();
        if added {
            info!(%action_hash, approver = %ctx.sender, approvals, "proposal approved");
            self.emit(EngineEvent::ProposalApproved {
                action_hash,
                approver: ctx.sender,
                approvals,
            });
        } else {
            debug!(%action_hash, approver = %ctx.sender, "duplicate approval ignored");
        }
        Ok(approvals)
    }

    /// Run an escalated action once it has quorum.
    ///
    /// Every check runs again against current state; only the large-transfer threshold is
    /// lifted. Proposals whose intent has expired are gone by then.
    pub fn execute_proposal<F: MarketFacts, A: ProtocolAdapter>(
        &mut self,
        ctx: &CallContext,
        action_hash: B256,
        facts: &F,
        adapter: &mut A,
    ) -> Result<SubmitOutcome, AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin, Role::Guardian])?;
        self.expire_proposals(ctx.timestamp);
        let submission = self.multisig.ready(action_hash)?.submission.clone();
        let outcome = self
            .process(ctx, &submission, action_hash, Authority::Multisig, facts, adapter)
            .inspect_err(|err| log_rejection(&submission.intent, err))?;
        self.multisig.mark_executed(action_hash);
        self.emit(EngineEvent::ProposalExecuted { action_hash });
        Ok(outcome)
    }

    fn process<F: MarketFacts, A: ProtocolAdapter>(
        &mut self,
        ctx: &CallContext,
        submission: &Submission,
        action_hash: B256,
        authority: Authority,
        facts: &F,
        adapter: &mut A,
    ) -> Result<SubmitOutcome, AuthError> {
        if self.risk.paused {
            return Err(AuthError::CircuitBreakerOpen);
        }
        let intent = &submission.intent;
        let (record, kind) =
            self.registry
                .check_target(intent.user, intent.protocol, submission.selector)?;
        if submission.kind != kind {
            return Err(AuthError::ActionKindMismatch {
                selector: submission.selector,
                declared: submission.kind,
                registered: kind,
            });
        }
        let digest = self.authenticate(submission)?;

        let inputs = RiskInputs {
            intent,
            kind,
            protocol: record,
            now: ctx.timestamp,
            authority,
        };
        let update = match evaluate(&inputs, &self.risk, &self.limits, &self.oracle, facts)? {
            RiskDecision::Proceed(update) => update,
            RiskDecision::Escalate => return Ok(self.escalate(ctx, submission, action_hash)),
        };

        // Accepted: the nonce is spent whether or not the protocol call succeeds.
        self.nonces.try_consume(intent.user, intent.nonce)?;

        let call = AdapterCall {
            user: intent.user,
            protocol: intent.protocol,
            selector: submission.selector,
            kind,
            amount: intent.amount,
            min_amount_out: intent.min_amount_out,
        };
        let amount_out = match adapter.execute(&call) {
            Ok(out) if out >= intent.min_amount_out => out,
            Ok(received) => {
                return Err(self.record_failure(
                    intent,
                    ExecutionFailure::SlippageExceeded {
                        min: intent.min_amount_out,
                        received,
                    },
                ))
            }
            Err(err) => return Err(self.record_failure(intent, ExecutionFailure::Reverted(err.reason))),
        };

        self.risk.apply(update);
        info!(
            user = %intent.user,
            protocol = %intent.protocol,
            ?kind,
            call = abi::selector_label(submission.selector),
            amount = %intent.amount,
            %amount_out,
            "allocation executed"
        );
        self.emit(EngineEvent::AllocationExecuted {
            user: intent.user,
            protocol: intent.protocol,
            kind,
            nonce: intent.nonce,
            amount: intent.amount,
            amount_out,
        });
        Ok(SubmitOutcome::Executed { digest, amount_out })
    }

    /// Chain binding, agent signature and nonce freshness. Returns the intent digest.
    fn authenticate(&self, submission: &Submission) -> Result<B256, AuthError> {
        let intent = &submission.intent;
        if intent.chain_id != self.chain_id {
            return Err(AuthError::WrongChain {
                expected: self.chain_id,
                got: intent.chain_id,
            });
        }

        let digest = intent.digest();
        let recovered = ecrecover_address(personal_message_hash(digest), &submission.signature)
            .map_err(|err| {
                debug!(?err, "signature recovery failed");
                AuthError::InvalidSignature
            })?;
        if recovered != self.registry.agent() {
            debug!(%recovered, agent = %self.registry.agent(), "signer is not the agent");
            return Err(AuthError::InvalidSignature);
        }

        self.nonces.ensure_unused(intent.user, intent.nonce)?;
        Ok(digest)
    }

    fn escalate(&mut self, ctx: &CallContext, submission: &Submission, action_hash: B256) -> SubmitOutcome {
        self.expire_proposals(ctx.timestamp);
        let required = self.governance.required_approvals;
        let (proposal, created) = self.multisig.open(action_hash, submission, required, ctx.timestamp);
        let approvals = proposal.approval_count();
        let required = proposal.required_approvals;
        if created {
            info!(%action_hash, amount = %submission.intent.amount, required, "action escalated to multisig");
            self.emit(EngineEvent::ProposalCreated {
                action_hash,
                user: submission.intent.user,
                amount: submission.intent.amount,
                required_approvals: required,
            });
        }
        SubmitOutcome::PendingApproval {
            action_hash,
            approvals,
            required,
        }
    }

    fn expire_proposals(&mut self, now: u64) {
        for action_hash in self.multisig.prune_expired(now) {
            debug!(%action_hash, "expired proposal dropped");
            self.emit(EngineEvent::ProposalExpired { action_hash });
        }
    }

    fn record_failure(&mut self, intent: &AllocationIntent, failure: ExecutionFailure) -> AuthError {
        let tripped = self.risk.record_failure(self.limits.failure_threshold);
        let consecutive_failures = self.risk.consecutive_failures;
        warn!(user = %intent.user, protocol = %intent.protocol, %failure, consecutive_failures, "allocation failed");
        self.emit(EngineEvent::AllocationFailed {
            user: intent.user,
            protocol: intent.protocol,
            nonce: intent.nonce,
            consecutive_failures,
        });
        if tripped {
            warn!(consecutive_failures, "circuit breaker opened");
            self.emit(EngineEvent::Paused {
                by: Address::ZERO,
                circuit_breaker: true,
            });
        }
        AuthError::ExecutionFailed(failure)
    }

    // ---------------------------------------------------------------------
    // Registry administration
    // ---------------------------------------------------------------------

    pub fn set_whitelist(&mut self, ctx: &CallContext, user: Address, whitelisted: bool) -> Result<(), AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        self.registry.set_whitelist(user, whitelisted);
        info!(%user, whitelisted, "whitelist updated");
        self.emit(EngineEvent::WhitelistUpdated { user, whitelisted });
        Ok(())
    }

    pub fn approve_protocol(&mut self, ctx: &CallContext, protocol: Address, approved: bool) -> Result<(), AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        if protocol == Address::ZERO {
            return Err(AuthError::InvalidParameter("protocol address is zero"));
        }
        self.registry
            .set_approved(protocol, approved, self.limits.default_concentration_cap_bps);
        info!(%protocol, approved, "protocol approval updated");
        self.emit(EngineEvent::ProtocolApprovalUpdated { protocol, approved });
        Ok(())
    }

    /// Replace the selector allow-list for `protocol`, classifying each call by what it does.
    pub fn set_allowed_selectors(
        &mut self,
        ctx: &CallContext,
        protocol: Address,
        selectors: impl IntoIterator<Item = (Selector, ActionKind)>,
    ) -> Result<(), AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        let selectors: BTreeMap<Selector, ActionKind> = selectors.into_iter().collect();
        let count = selectors.len();
        self.registry
            .set_allowed_selectors(protocol, selectors, self.limits.default_concentration_cap_bps);
        info!(%protocol, count, "allowed selectors updated");
        self.emit(EngineEvent::AllowedSelectorsUpdated { protocol, count });
        Ok(())
    }

    pub fn set_lending_protocol(&mut self, ctx: &CallContext, protocol: Address, is_lending: bool) -> Result<(), AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        let default_cap = self.limits.default_concentration_cap_bps;
        self.registry.set_lending_flag(protocol, is_lending, default_cap);
        self.emit_protocol_params(protocol);
        Ok(())
    }

    /// Lowering a cap applies now; raising it waits out the timelock.
    pub fn set_concentration_cap(
        &mut self,
        ctx: &CallContext,
        protocol: Address,
        cap_bps: u16,
    ) -> Result<ChangeOutcome, AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        if u64::from(cap_bps) > BPS_DENOMINATOR {
            return Err(AuthError::InvalidParameter("concentration cap exceeds 10000 bps"));
        }
        let current = self
            .registry
            .protocol(protocol)
            .map_or(self.limits.default_concentration_cap_bps, |record| record.concentration_cap_bps);
        if cap_bps > current {
            return Ok(self.schedule(ctx, PrivilegedChange::SetConcentrationCap { protocol, cap_bps }));
        }
        self.apply_change(PrivilegedChange::SetConcentrationCap { protocol, cap_bps });
        Ok(ChangeOutcome::Applied)
    }

    /// Assign a role. Guardians are added immediately; Agent and Admin hand-overs are timelocked.
    pub fn set_role(&mut self, ctx: &CallContext, who: Address, role: Role) -> Result<ChangeOutcome, AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        if who == Address::ZERO {
            return Err(AuthError::InvalidParameter("role holder is zero"));
        }
        match role {
            Role::Guardian => {
                self.registry.set_guardian(who, true);
                info!(guardian = %who, "guardian added");
                self.emit(EngineEvent::GuardianUpdated { guardian: who, active: true });
                Ok(ChangeOutcome::Applied)
            }
            Role::Agent => Ok(self.schedule(ctx, PrivilegedChange::SetAgent(who))),
            Role::Admin => Ok(self.schedule(ctx, PrivilegedChange::SetAdmin(who))),
        }
    }

    /// Register or drop a relayer allowed to hand agent-signed submissions to [`Self::submit`].
    pub fn set_relayer(&mut self, ctx: &CallContext, relayer: Address, active: bool) -> Result<(), AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        if relayer == Address::ZERO {
            return Err(AuthError::InvalidParameter("relayer is zero"));
        }
        self.registry.set_relayer(relayer, active);
        info!(%relayer, active, "relayer updated");
        self.emit(EngineEvent::RelayerUpdated { relayer, active });
        Ok(())
    }

    pub fn revoke_guardian(&mut self, ctx: &CallContext, guardian: Address) -> Result<(), AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        self.registry.set_guardian(guardian, false);
        info!(%guardian, "guardian revoked");
        self.emit(EngineEvent::GuardianUpdated { guardian, active: false });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Risk administration
    // ---------------------------------------------------------------------

    /// Emergency stop. Either an Admin or a Guardian may pull it.
    pub fn pause(&mut self, ctx: &CallContext) -> Result<(), AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin, Role::Guardian])?;
        self.risk.paused = true;
        warn!(by = %ctx.sender, "paused");
        self.emit(EngineEvent::Paused {
            by: ctx.sender,
            circuit_breaker: false,
        });
        Ok(())
    }

    /// Lift a pause (manual or circuit breaker) and reset the failure streak.
    pub fn unpause(&mut self, ctx: &CallContext) -> Result<(), AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin, Role::Guardian])?;
        self.risk.paused = false;
        self.risk.consecutive_failures = 0;
        info!(by = %ctx.sender, "unpaused");
        self.emit(EngineEvent::Unpaused { by: ctx.sender });
        Ok(())
    }

    /// Replace the risk limits. Tightening applies now; any loosening is timelocked.
    pub fn set_limits(&mut self, ctx: &CallContext, limits: RiskLimits) -> Result<ChangeOutcome, AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        limits.validate().map_err(invalid_parameter)?;
        if limits.loosens(&self.limits) {
            return Ok(self.schedule(ctx, PrivilegedChange::SetLimits(limits)));
        }
        self.apply_change(PrivilegedChange::SetLimits(limits));
        Ok(ChangeOutcome::Applied)
    }

    pub fn set_oracle(&mut self, ctx: &CallContext, feeds: OracleFeeds) -> Result<ChangeOutcome, AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        if feeds.price_feed == Address::ZERO {
            return Err(AuthError::InvalidParameter("price feed is zero"));
        }
        Ok(self.schedule(ctx, PrivilegedChange::SetOracle(feeds)))
    }

    pub fn set_governance(&mut self, ctx: &CallContext, params: GovernanceParams) -> Result<ChangeOutcome, AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        if params.required_approvals == 0 {
            return Err(AuthError::InvalidParameter("required approvals must be at least 1"));
        }
        Ok(self.schedule(ctx, PrivilegedChange::SetGovernance(params)))
    }

    // ---------------------------------------------------------------------
    // Timelock
    // ---------------------------------------------------------------------

    pub fn execute_timelock(&mut self, ctx: &CallContext, id: u64) -> Result<(), AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        let change = self.timelock.take_ready(id, ctx.timestamp)?;
        info!(id, ?change, "timelocked change executed");
        self.apply_change(change);
        self.emit(EngineEvent::TimelockExecuted { id });
        Ok(())
    }

    pub fn cancel_timelock(&mut self, ctx: &CallContext, id: u64) -> Result<(), AuthError> {
        self.registry.require_role(ctx.sender, &[Role::Admin])?;
        let entry = self.timelock.cancel(id)?;
        info!(id, change = ?entry.change, "timelocked change cancelled");
        self.emit(EngineEvent::TimelockCancelled { id });
        Ok(())
    }

    fn schedule(&mut self, ctx: &CallContext, change: PrivilegedChange) -> ChangeOutcome {
        let delay = self.governance.timelock_delay_secs;
        let entry = self.timelock.schedule(change, ctx.timestamp, delay);
        let (id, executable_after) = (entry.id, entry.executable_after);
        info!(id, executable_after, change = ?entry.change, "change scheduled");
        self.emit(EngineEvent::TimelockScheduled { id, executable_after });
        ChangeOutcome::Scheduled { id, executable_after }
    }

    fn apply_change(&mut self, change: PrivilegedChange) {
        match change {
            PrivilegedChange::SetAgent(agent) => {
                let previous = self.registry.set_agent(agent);
                self.emit(EngineEvent::PrincipalChanged {
                    role: Role::Agent,
                    previous,
                    current: agent,
                });
            }
            PrivilegedChange::SetAdmin(admin) => {
                let previous = self.registry.set_admin(admin);
                self.emit(EngineEvent::PrincipalChanged {
                    role: Role::Admin,
                    previous,
                    current: admin,
                });
            }
            PrivilegedChange::SetLimits(limits) => {
                self.emit(EngineEvent::LimitsUpdated {
                    max_tx_amount: limits.max_tx_amount,
                    daily_cap: limits.daily_cap,
                    large_transfer_threshold: limits.large_transfer_threshold,
                });
                self.limits = limits;
            }
            PrivilegedChange::SetOracle(feeds) => {
                self.oracle = feeds;
                self.emit(EngineEvent::OracleUpdated {
                    price_feed: feeds.price_feed,
                    sequencer_feed: feeds.sequencer_feed,
                });
            }
            PrivilegedChange::SetConcentrationCap { protocol, cap_bps } => {
                let default_cap = self.limits.default_concentration_cap_bps;
                self.registry.set_concentration_cap(protocol, cap_bps, default_cap);
                self.emit_protocol_params(protocol);
            }
            PrivilegedChange::SetGovernance(params) => {
                self.emit(EngineEvent::GovernanceUpdated {
                    required_approvals: params.required_approvals,
                    timelock_delay_secs: params.timelock_delay_secs,
                });
                self.governance = params;
            }
        }
    }

    fn emit_protocol_params(&mut self, protocol: Address) {
        if let Some(record) = self.registry.protocol(protocol) {
            let event = EngineEvent::ProtocolParamsUpdated {
                protocol,
                is_lending: record.is_lending_protocol,
                concentration_cap_bps: record.concentration_cap_bps,
            };
            info!(?event, "protocol params updated");
            self.emit(event);
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    pub fn governance(&self) -> &GovernanceParams {
        &self.governance
    }

    pub fn oracle(&self) -> &OracleFeeds {
        &self.oracle
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn risk_state(&self) -> &RiskState {
        &self.risk
    }

    pub fn is_paused(&self) -> bool {
        self.risk.paused
    }

    pub fn is_nonce_consumed(&self, user: Address, nonce: U256) -> bool {
        self.nonces.is_consumed(user, nonce)
    }

    pub fn proposal(&self, action_hash: B256) -> Option<&MultisigProposal> {
        self.multisig.get(action_hash)
    }

    pub fn open_proposals(&self) -> usize {
        self.multisig.count()
    }

    pub fn timelock_entry(&self, id: u64) -> Option<&TimelockEntry> {
        self.timelock.get(id)
    }

    pub fn pending_changes(&self) -> impl Iterator<Item = &TimelockEntry> {
        self.timelock.pending()
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Drain the event buffer.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}

fn invalid_parameter(err: ConfigError) -> AuthError {
    match err {
        ConfigError::Invalid(reason) => AuthError::InvalidParameter(reason),
        _ => AuthError::InvalidParameter("invalid limits"),
    }
}

fn log_rejection(intent: &AllocationIntent, err: &AuthError) {
    warn!(user = %intent.user, protocol = %intent.protocol, nonce = %intent.nonce, %err, "allocation rejected");
}
