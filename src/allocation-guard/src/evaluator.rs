//! Risk & limit evaluation.
//!
//! [`evaluate`] is pure: it reads [`RiskState`] and the oracle facts and returns either the
//! state delta to commit or the first failing check. The engine applies the delta only after
//! execution succeeds, so a rejected intent never leaves a partial mutation behind.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use allocation_guard_types::{ActionKind, AllocationIntent, MarketFacts};
use tracing::debug;

use crate::{
    config::{OracleFeeds, RiskLimits},
    constants::{BPS_DENOMINATOR, DAILY_WINDOW_SECS},
    errors::AuthError,
    registry::ProtocolRecord,
};

/// Wallet-global risk counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RiskState {
    pub daily_spent: U256,
    pub window_start: u64,
    /// Wallet-global: one user's failing actions can pause the whole wallet.
    pub consecutive_failures: u32,
    pub paused: bool,
    pub last_rebalance_at: Option<u64>,
    pub exposure: BTreeMap<Address, U256>,
}

/// Under whose authority an action is being evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authority {
    /// Agent signature only; amounts above the large-transfer threshold escalate.
    SingleSigner,
    /// Agent signature plus a multisig quorum; the threshold no longer applies.
    Multisig,
}

/// State changes produced by a passing evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiskUpdate {
    pub window_start: u64,
    pub daily_spent: U256,
    pub protocol: Address,
    pub exposure_after: U256,
    pub rebalanced_at: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RiskDecision {
    Proceed(RiskUpdate),
    /// Too large for a single signer: route through the multisig instead of executing.
    Escalate,
}

/// Everything about the action under evaluation.
pub struct RiskInputs<'a> {
    pub intent: &'a AllocationIntent,
    pub kind: ActionKind,
    pub protocol: &'a ProtocolRecord,
    pub now: u64,
    pub authority: Authority,
}

/// Evaluate an authenticated intent, short-circuiting on the first failed check.
pub fn evaluate<F: MarketFacts>(
    inputs: &RiskInputs<'_>,
    state: &RiskState,
    limits: &RiskLimits,
    feeds: &OracleFeeds,
    facts: &F,
) -> Result<RiskDecision, AuthError> {
    let intent = inputs.intent;
    let now = inputs.now;

    if state.paused {
        return Err(AuthError::CircuitBreakerOpen);
    }
    if now > intent.deadline {
        return Err(AuthError::IntentExpired);
    }

    check_sequencer(feeds, limits, facts, now)?;
    let price = facts
        .latest_price(feeds.price_feed)
        .map_err(|_| AuthError::OracleStale)?;
    if price.price.is_zero() || now.saturating_sub(price.updated_at) > limits.max_oracle_age_secs {
        return Err(AuthError::OracleStale);
    }

    // De-peg: an external condition, never counted toward the failure streak.
    let par = U256::from(BPS_DENOMINATOR);
    let band = U256::from(limits.depeg_band_bps);
    let price_bps = price.as_bps_of_par();
    if price_bps.saturating_add(band) < par || price_bps > par.saturating_add(band) {
        debug!(%price_bps, "stable asset outside peg band");
        return Err(AuthError::AssetDepegged);
    }

    if !intent.price_at_sign.is_zero() {
        let drift = abs_diff(price.price, intent.price_at_sign);
        let tolerance = intent
            .price_at_sign
            .saturating_mul(U256::from(limits.max_price_drift_bps));
        if drift.saturating_mul(par) > tolerance {
            return Err(AuthError::PriceMovedSinceSign);
        }
    }

    if intent.amount > limits.max_tx() {
        return Err(AuthError::AmountExceedsTxCap);
    }
    // Escalation is decided here but reported last, so a proposal is only opened for an action
    // that would pass every remaining check today.
    let escalate =
        inputs.authority == Authority::SingleSigner && intent.amount > limits.escalation_threshold();

    let (window_start, spent) = if now.saturating_sub(state.window_start) >= DAILY_WINDOW_SECS {
        (now, U256::ZERO)
    } else {
        (state.window_start, state.daily_spent)
    };
    let daily_spent = spent.saturating_add(intent.amount);
    if daily_spent > limits.daily() {
        return Err(AuthError::DailyCapExceeded);
    }

    let current = state.exposure_of(intent.protocol);
    let exposure_after = if inputs.kind.adds_exposure() {
        let total = facts
            .total_managed_assets()
            .map_err(|_| AuthError::OracleStale)?;
        let after = current.saturating_add(intent.amount);
        let cap = total.saturating_mul(U256::from(inputs.protocol.concentration_cap_bps));
        if after.saturating_mul(par) > cap {
            return Err(AuthError::ProtocolCapExceeded);
        }
        after
    } else {
        current.saturating_sub(intent.amount)
    };

    let rebalanced_at = if inputs.kind.is_rebalance() {
        if let Some(last) = state.last_rebalance_at {
            if now.saturating_sub(last) < limits.rebalance_cooldown_secs {
                return Err(AuthError::RebalanceCooldown);
            }
        }
        Some(now)
    } else {
        None
    };

    if escalate {
        debug!(amount = %intent.amount, "above large-transfer threshold");
        return Ok(RiskDecision::Escalate);
    }
    Ok(RiskDecision::Proceed(RiskUpdate {
        window_start,
        daily_spent,
        protocol: intent.protocol,
        exposure_after,
        rebalanced_at,
    }))
}

fn check_sequencer<F: MarketFacts>(
    feeds: &OracleFeeds,
    limits: &RiskLimits,
    facts: &F,
    now: u64,
) -> Result<(), AuthError> {
    let Some(feed) = feeds.sequencer_feed else {
        return Ok(());
    };
    let status = facts
        .sequencer_status(feed)
        .map_err(|_| AuthError::OracleStale)?;
    if !status.is_up || now.saturating_sub(status.status_since) < limits.sequencer_grace_period_secs {
        return Err(AuthError::SequencerDown);
    }
    Ok(())
}

fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

impl RiskState {
    /// Commit a passing evaluation after the adapter reported success.
    pub fn apply(&mut self, update: RiskUpdate) {
        self.window_start = update.window_start;
        self.daily_spent = update.daily_spent;
        self.exposure.insert(update.protocol, update.exposure_after);
        if let Some(at) = update.rebalanced_at {
            self.last_rebalance_at = Some(at);
        }
        self.consecutive_failures = 0;
    }

    /// Count an execution failure; returns true when this failure opened the breaker.
    pub fn record_failure(&mut self, threshold: u32) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if !self.paused && self.consecutive_failures >= threshold {
            self.paused = true;
            return true;
        }
        false
    }

    pub fn exposure_of(&self, protocol: Address) -> U256 {
        self.exposure.get(&protocol).copied().unwrap_or(U256::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use allocation_guard_types::{FactsError, PriceReading, SequencerStatus};

    const FEED: Address = address!("00000000000000000000000000000000000000f1");
    const SEQ: Address = address!("00000000000000000000000000000000000000f2");
    const POOL: Address = address!("00000000000000000000000000000000000000d1");
    const NOW: u64 = 1_000_000;

    struct Facts {
        price: U256,
        updated_at: u64,
        sequencer_up: bool,
        sequencer_since: u64,
        total: U256,
    }

    impl Default for Facts {
        fn default() -> Self {
            Self {
                price: U256::from(100_000_000u64),
                updated_at: NOW,
                sequencer_up: true,
                sequencer_since: 0,
                total: U256::from(10_000_000u64),
            }
        }
    }

    impl MarketFacts for Facts {
        fn latest_price(&self, feed: Address) -> Result<PriceReading, FactsError> {
            if feed != FEED {
                return Err(FactsError::FeedUnavailable { feed });
            }
            Ok(PriceReading { price: self.price, decimals: 8, updated_at: self.updated_at })
        }

        fn sequencer_status(&self, _feed: Address) -> Result<SequencerStatus, FactsError> {
            Ok(SequencerStatus { is_up: self.sequencer_up, status_since: self.sequencer_since })
        }

        fn total_managed_assets(&self) -> Result<U256, FactsError> {
            Ok(self.total)
        }
    }

    fn limits() -> RiskLimits {
        RiskLimits {
            max_tx_amount: 900_000,
            daily_cap: 1_000_000,
            large_transfer_threshold: 700_000,
            ..RiskLimits::default()
        }
    }

    fn feeds() -> OracleFeeds {
        OracleFeeds { price_feed: FEED, sequencer_feed: Some(SEQ) }
    }

    fn intent(amount: u64) -> AllocationIntent {
        AllocationIntent {
            user: address!("00000000000000000000000000000000000000c1"),
            protocol: POOL,
            amount: U256::from(amount),
            min_amount_out: U256::ZERO,
            deadline: NOW + 60,
            nonce: U256::from(1u64),
            price_at_sign: U256::ZERO,
            chain_id: 8453,
        }
    }

    fn record() -> ProtocolRecord {
        ProtocolRecord { approved: true, concentration_cap_bps: 10_000, ..Default::default() }
    }

    fn run(intent: &AllocationIntent, kind: ActionKind, state: &RiskState, facts: &Facts) -> Result<RiskDecision, AuthError> {
        let protocol = record();
        let inputs = RiskInputs { intent, kind, protocol: &protocol, now: NOW, authority: Authority::SingleSigner };
        evaluate(&inputs, state, &limits(), &feeds(), facts)
    }

    fn proceed(decision: Result<RiskDecision, AuthError>) -> RiskUpdate {
        match decision {
            Ok(RiskDecision::Proceed(update)) => update,
            other => panic!("expected proceed, got {other:?}"),
        }
    }

    #[test]
    fn daily_cap_and_window_roll() {
        let mut state = RiskState::default();
        let first = proceed(run(&intent(600_000), ActionKind::Deposit, &state, &Facts::default()));
        assert_eq!(first.daily_spent, U256::from(600_000u64));
        assert_eq!(first.window_start, NOW);
        state.apply(first);

        assert_eq!(
            run(&intent(500_000), ActionKind::Deposit, &state, &Facts::default()),
            Err(AuthError::DailyCapExceeded)
        );

        state.window_start = NOW - DAILY_WINDOW_SECS;
        let rolled = proceed(run(&intent(500_000), ActionKind::Deposit, &state, &Facts::default()));
        assert_eq!(rolled.daily_spent, U256::from(500_000u64));
        assert_eq!(rolled.window_start, NOW);
    }

    #[test]
    fn paused_and_expired_short_circuit() {
        let state = RiskState { paused: true, ..Default::default() };
        assert_eq!(
            run(&intent(1), ActionKind::Deposit, &state, &Facts::default()),
            Err(AuthError::CircuitBreakerOpen)
        );

        let mut late = intent(1);
        late.deadline = NOW - 1;
        assert_eq!(
            run(&late, ActionKind::Deposit, &RiskState::default(), &Facts::default()),
            Err(AuthError::IntentExpired)
        );
    }

    #[test]
    fn oracle_health_guards() {
        let stale = Facts { updated_at: NOW - 3_601, ..Default::default() };
        assert_eq!(run(&intent(1), ActionKind::Deposit, &RiskState::default(), &stale), Err(AuthError::OracleStale));

        let down = Facts { sequencer_up: false, ..Default::default() };
        assert_eq!(run(&intent(1), ActionKind::Deposit, &RiskState::default(), &down), Err(AuthError::SequencerDown));

        let recovering = Facts { sequencer_since: NOW - 60, ..Default::default() };
        assert_eq!(
            run(&intent(1), ActionKind::Deposit, &RiskState::default(), &recovering),
            Err(AuthError::SequencerDown)
        );
    }

    #[test]
    fn depeg_band() {
        // 0.9940 with 8 decimals is below the 50 bps band.
        let low = Facts { price: U256::from(99_400_000u64), ..Default::default() };
        assert_eq!(run(&intent(1), ActionKind::Deposit, &RiskState::default(), &low), Err(AuthError::AssetDepegged));

        let edge = Facts { price: U256::from(99_500_000u64), ..Default::default() };
        assert!(run(&intent(1), ActionKind::Deposit, &RiskState::default(), &edge).is_ok());

        let high = Facts { price: U256::from(100_600_000u64), ..Default::default() };
        assert_eq!(run(&intent(1), ActionKind::Deposit, &RiskState::default(), &high), Err(AuthError::AssetDepegged));
    }

    #[test]
    fn drift_since_signing() {
        let mut signed = intent(1);
        signed.price_at_sign = U256::from(100_700_000u64);
        let facts = Facts { price: U256::from(99_600_000u64), ..Default::default() };
        assert_eq!(
            run(&signed, ActionKind::Deposit, &RiskState::default(), &facts),
            Err(AuthError::PriceMovedSinceSign)
        );
        signed.price_at_sign = U256::from(99_700_000u64);
        assert!(run(&signed, ActionKind::Deposit, &RiskState::default(), &facts).is_ok());
    }

    #[test]
    fn tx_cap_and_escalation() {
        let facts = Facts::default();
        assert_eq!(
            run(&intent(950_000), ActionKind::Deposit, &RiskState::default(), &facts),
            Err(AuthError::AmountExceedsTxCap)
        );
        assert_eq!(
            run(&intent(800_000), ActionKind::Deposit, &RiskState::default(), &facts),
            Ok(RiskDecision::Escalate)
        );

        let protocol = record();
        let approved = |amount: u64| {
            let big = intent(amount);
            let inputs = RiskInputs {
                intent: &big,
                kind: ActionKind::Deposit,
                protocol: &protocol,
                now: NOW,
                authority: Authority::Multisig,
            };
            evaluate(&inputs, &RiskState::default(), &limits(), &feeds(), &facts)
        };
        assert!(matches!(approved(800_000), Ok(RiskDecision::Proceed(_))));
        // A quorum never lifts the per-transaction ceiling.
        assert_eq!(approved(950_000), Err(AuthError::AmountExceedsTxCap));
    }

    #[test]
    fn escalation_only_for_actions_that_could_pass() {
        let spent = RiskState {
            window_start: NOW,
            daily_spent: U256::from(300_000u64),
            ..Default::default()
        };
        assert_eq!(
            run(&intent(800_000), ActionKind::Deposit, &spent, &Facts::default()),
            Err(AuthError::DailyCapExceeded)
        );

        let thin = Facts { total: U256::from(1_000_000u64), ..Default::default() };
        let protocol = ProtocolRecord { approved: true, concentration_cap_bps: 5_000, ..Default::default() };
        let big = intent(800_000);
        let inputs = RiskInputs {
            intent: &big,
            kind: ActionKind::Deposit,
            protocol: &protocol,
            now: NOW,
            authority: Authority::SingleSigner,
        };
        assert_eq!(
            evaluate(&inputs, &RiskState::default(), &limits(), &feeds(), &thin),
            Err(AuthError::ProtocolCapExceeded)
        );
    }

    #[test]
    fn concentration_cap() {
        let protocol = ProtocolRecord { approved: true, concentration_cap_bps: 2_500, ..Default::default() };
        let mut state = RiskState::default();
        state.exposure.insert(POOL, U256::from(2_000_000u64));
        let facts = Facts::default();

        let ok = intent(500_000);
        let inputs = RiskInputs { intent: &ok, kind: ActionKind::Deposit, protocol: &protocol, now: NOW, authority: Authority::SingleSigner };
        let update = proceed(evaluate(&inputs, &state, &limits(), &feeds(), &facts));
        assert_eq!(update.exposure_after, U256::from(2_500_000u64));

        let over = intent(500_001);
        let inputs = RiskInputs { intent: &over, ..inputs };
        assert_eq!(
            evaluate(&inputs, &state, &limits(), &feeds(), &facts),
            Err(AuthError::ProtocolCapExceeded)
        );

        // Withdrawals only shrink exposure.
        let inputs = RiskInputs { kind: ActionKind::Withdraw, ..inputs };
        let update = proceed(evaluate(&inputs, &state, &limits(), &feeds(), &facts));
        assert_eq!(update.exposure_after, U256::from(1_499_999u64));
    }

    #[test]
    fn rebalance_cooldown() {
        let state = RiskState { last_rebalance_at: Some(NOW - 3_600), ..Default::default() };
        assert_eq!(
            run(&intent(10), ActionKind::Rebalance, &state, &Facts::default()),
            Err(AuthError::RebalanceCooldown)
        );
        // Deposits ignore the cool-down.
        assert!(run(&intent(10), ActionKind::Deposit, &state, &Facts::default()).is_ok());

        let later = RiskState { last_rebalance_at: Some(NOW - 4 * 3_600), ..Default::default() };
        let update = proceed(run(&intent(10), ActionKind::Rebalance, &later, &Facts::default()));
        assert_eq!(update.rebalanced_at, Some(NOW));
    }

    #[test]
    fn failure_streak_opens_breaker_once() {
        let mut state = RiskState::default();
        assert!(!state.record_failure(3));
        assert!(!state.record_failure(3));
        assert!(state.record_failure(3));
        assert!(state.paused);
        assert!(!state.record_failure(3));

        state.paused = false;
        state.apply(RiskUpdate {
            window_start: NOW,
            daily_spent: U256::ZERO,
            protocol: POOL,
            exposure_after: U256::ZERO,
            rebalanced_at: None,
        });
        assert_eq!(state.consecutive_failures, 0);
    }
}
