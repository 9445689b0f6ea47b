//! Sequence-guarded coordination of in-flight inference calls.
//!
//! Every AI call belongs to a [`Slot`]. The coordinator hands out a sequence
//! number when a call is issued and checks it when the call settles. A settle
//! carrying anything but the slot's current sequence is stale and is dropped
//! without touching state, which gives each slot last-issued-wins semantics
//! without any cancellation plumbing on the shell side.

use serde::{Deserialize, Serialize};

use crate::schema::InferenceResponse;
use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    MealAnalysis,
    Simulation,
    CanteenPick,
    PointExplanation,
    CookAtHome,
}

impl Slot {
    pub const ALL: [Self; 5] = [
        Self::MealAnalysis,
        Self::Simulation,
        Self::CanteenPick,
        Self::PointExplanation,
        Self::CookAtHome,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MealAnalysis => "meal_analysis",
            Self::Simulation => "simulation",
            Self::CanteenPick => "canteen_pick",
            Self::PointExplanation => "point_explanation",
            Self::CookAtHome => "cook_at_home",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::MealAnalysis => 0,
            Self::Simulation => 1,
            Self::CanteenPick => 2,
            Self::PointExplanation => 3,
            Self::CookAtHome => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum InferenceOutcome {
    #[default]
    Idle,
    Pending,
    Succeeded(InferenceResponse),
    Failed(AppError),
    Cancelled,
}

impl InferenceOutcome {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// What `on_settled` did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleDisposition {
    /// The result carried the current sequence and was recorded.
    Applied,
    /// The result was stale (reissued, cancelled, or timed out since) and
    /// was dropped without mutating the slot.
    Superseded,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestCoordinator {
    seqs: [u64; 5],
    outcomes: [InferenceOutcome; 5],
}

impl RequestCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new call on `slot`. Any earlier in-flight call on the same
    /// slot is implicitly superseded. Returns the sequence number the caller
    /// must thread through to [`Self::on_settled`].
    pub fn issue(&mut self, slot: Slot) -> u64 {
        let i = slot.index();
        self.seqs[i] += 1;
        self.outcomes[i] = InferenceOutcome::Pending;
        tracing::debug!(slot = slot.as_str(), seq = self.seqs[i], "issued");
        self.seqs[i]
    }

    /// Records the result of a settled call, unless it is stale.
    pub fn on_settled(
        &mut self,
        slot: Slot,
        seq: u64,
        result: Result<InferenceResponse, AppError>,
    ) -> SettleDisposition {
        let i = slot.index();
        if seq != self.seqs[i] {
            tracing::debug!(
                slot = slot.as_str(),
                stale_seq = seq,
                current_seq = self.seqs[i],
                "dropping superseded result"
            );
            return SettleDisposition::Superseded;
        }
        self.outcomes[i] = match result {
            Ok(response) => InferenceOutcome::Succeeded(response),
            Err(error) => {
                tracing::warn!(slot = slot.as_str(), seq, %error, "call failed");
                InferenceOutcome::Failed(error)
            }
        };
        SettleDisposition::Applied
    }

    /// Abandons the slot's call, in flight or not. The sequence is always
    /// bumped so any earlier call's eventual settle lands stale, and the
    /// outcome becomes `Cancelled` right away.
    pub fn cancel(&mut self, slot: Slot) {
        let i = slot.index();
        self.seqs[i] += 1;
        self.outcomes[i] = InferenceOutcome::Cancelled;
        tracing::debug!(slot = slot.as_str(), seq = self.seqs[i], "cancelled");
    }

    /// Converts a still-pending call into a timeout failure, bumping the
    /// sequence so a late response from the timed-out call lands stale.
    /// Returns whether anything was pending.
    pub fn time_out(&mut self, slot: Slot) -> bool {
        let i = slot.index();
        if !self.outcomes[i].is_pending() {
            return false;
        }
        self.seqs[i] += 1;
        self.outcomes[i] = InferenceOutcome::Failed(AppError::new(
            ErrorKind::Timeout,
            "inference timed out",
        ));
        tracing::warn!(slot = slot.as_str(), seq = self.seqs[i], "timed out");
        true
    }

    /// Resets every outcome to `Idle` without resetting the sequence
    /// counters. Counters stay monotonic for the coordinator's lifetime so a
    /// call issued before a reset can never be applied after it.
    pub fn clear_outcomes(&mut self) {
        for slot in Slot::ALL {
            let i = slot.index();
            if self.outcomes[i].is_pending() {
                self.seqs[i] += 1;
            }
            self.outcomes[i] = InferenceOutcome::Idle;
        }
    }

    #[must_use]
    pub fn outcome(&self, slot: Slot) -> &InferenceOutcome {
        &self.outcomes[slot.index()]
    }

    #[must_use]
    pub fn current_seq(&self, slot: Slot) -> u64 {
        self.seqs[slot.index()]
    }

    #[must_use]
    pub fn is_pending(&self, slot: Slot) -> bool {
        self.outcomes[slot.index()].is_pending()
    }

    #[must_use]
    pub fn any_pending(&self) -> bool {
        Slot::ALL.iter().any(|s| self.is_pending(*s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{self, InferenceResponse};
    use crate::ErrorKind;
    use assert_matches::assert_matches;

    fn ok_response() -> Result<InferenceResponse, AppError> {
        Ok(InferenceResponse::PointExplanation(
            schema::PointExplanation {
                insight: "energy dips".into(),
                biological_reasoning: "glucose clears".into(),
                practical_advice: "take a short walk".into(),
            },
        ))
    }

    #[test]
    fn test_issue_increments_sequence_per_slot() {
        let mut c = RequestCoordinator::new();
        assert_eq!(c.issue(Slot::MealAnalysis), 1);
        assert_eq!(c.issue(Slot::MealAnalysis), 2);
        assert_eq!(c.issue(Slot::Simulation), 1);
        assert!(c.is_pending(Slot::MealAnalysis));
    }

    #[test]
    fn test_current_settle_is_applied() {
        let mut c = RequestCoordinator::new();
        let seq = c.issue(Slot::PointExplanation);
        assert_eq!(
            c.on_settled(Slot::PointExplanation, seq, ok_response()),
            SettleDisposition::Applied
        );
        assert_matches!(
            c.outcome(Slot::PointExplanation),
            InferenceOutcome::Succeeded(_)
        );
    }

    #[test]
    fn test_stale_settle_is_dropped() {
        let mut c = RequestCoordinator::new();
        let first = c.issue(Slot::CanteenPick);
        let second = c.issue(Slot::CanteenPick);
        assert_eq!(
            c.on_settled(Slot::CanteenPick, first, ok_response()),
            SettleDisposition::Superseded
        );
        assert!(c.is_pending(Slot::CanteenPick));
        assert_eq!(
            c.on_settled(Slot::CanteenPick, second, ok_response()),
            SettleDisposition::Applied
        );
    }

    #[test]
    fn test_failure_is_recorded_on_current_sequence() {
        let mut c = RequestCoordinator::new();
        let seq = c.issue(Slot::Simulation);
        let err = AppError::new(ErrorKind::Transport, "offline");
        c.on_settled(Slot::Simulation, seq, Err(err));
        assert_matches!(c.outcome(Slot::Simulation), InferenceOutcome::Failed(e) if e.kind == ErrorKind::Transport);
    }

    #[test]
    fn test_cancel_supersedes_in_flight_call() {
        let mut c = RequestCoordinator::new();
        let seq = c.issue(Slot::CookAtHome);
        c.cancel(Slot::CookAtHome);
        assert_eq!(c.outcome(Slot::CookAtHome), &InferenceOutcome::Cancelled);
        assert_eq!(
            c.on_settled(Slot::CookAtHome, seq, ok_response()),
            SettleDisposition::Superseded
        );
        assert_eq!(c.outcome(Slot::CookAtHome), &InferenceOutcome::Cancelled);
    }

    #[test]
    fn test_cancel_without_pending_call_still_bumps_sequence() {
        let mut c = RequestCoordinator::new();
        c.cancel(Slot::MealAnalysis);
        assert_eq!(c.outcome(Slot::MealAnalysis), &InferenceOutcome::Cancelled);
        assert_eq!(c.current_seq(Slot::MealAnalysis), 1);

        // A resolution for a pre-cancel sequence is dropped.
        assert_eq!(
            c.on_settled(Slot::MealAnalysis, 0, ok_response()),
            SettleDisposition::Superseded
        );
        assert_eq!(c.outcome(Slot::MealAnalysis), &InferenceOutcome::Cancelled);
    }

    #[test]
    fn test_time_out_fails_pending_and_drops_late_response() {
        let mut c = RequestCoordinator::new();
        let seq = c.issue(Slot::MealAnalysis);
        assert!(c.time_out(Slot::MealAnalysis));
        assert_matches!(
            c.outcome(Slot::MealAnalysis),
            InferenceOutcome::Failed(e) if e.kind == ErrorKind::Timeout
        );
        assert_eq!(
            c.on_settled(Slot::MealAnalysis, seq, ok_response()),
            SettleDisposition::Superseded
        );
        // Nothing pending any more, so a second timer firing is a no-op.
        assert!(!c.time_out(Slot::MealAnalysis));
    }

    #[test]
    fn test_clear_outcomes_keeps_sequences_monotonic() {
        let mut c = RequestCoordinator::new();
        let in_flight = c.issue(Slot::CanteenPick);
        c.clear_outcomes();
        assert_eq!(c.outcome(Slot::CanteenPick), &InferenceOutcome::Idle);
        // The pre-reset call must land stale.
        assert_eq!(
            c.on_settled(Slot::CanteenPick, in_flight, ok_response()),
            SettleDisposition::Superseded
        );
        assert!(c.current_seq(Slot::CanteenPick) > in_flight);
    }

    mod interleavings {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Action {
            Issue,
            Cancel,
            SettleLatest,
            SettleStale(u64),
        }

        fn action_strategy() -> impl Strategy<Value = Action> {
            prop_oneof![
                Just(Action::Issue),
                Just(Action::Cancel),
                Just(Action::SettleLatest),
                (0u64..20).prop_map(Action::SettleStale),
            ]
        }

        proptest! {
            // Whatever the interleaving, only a settle carrying the latest
            // issued sequence may change a pending slot, and sequences never
            // decrease.
            #[test]
            fn test_outcome_always_reflects_latest_action(
                actions in proptest::collection::vec(action_strategy(), 1..40)
            ) {
                let mut c = RequestCoordinator::new();
                let slot = Slot::MealAnalysis;
                let mut last_seq = 0;

                for action in actions {
                    let seq_before = c.current_seq(slot);
                    match action {
                        Action::Issue => {
                            let seq = c.issue(slot);
                            prop_assert!(seq > last_seq);
                            last_seq = seq;
                            prop_assert!(c.is_pending(slot));
                        }
                        Action::Cancel => {
                            c.cancel(slot);
                            last_seq = c.current_seq(slot);
                        }
                        Action::SettleLatest => {
                            let was_pending = c.is_pending(slot);
                            let disposition =
                                c.on_settled(slot, c.current_seq(slot), ok_response());
                            prop_assert_eq!(disposition, SettleDisposition::Applied);
                            if was_pending {
                                prop_assert!(matches!(
                                    c.outcome(slot),
                                    InferenceOutcome::Succeeded(_)
                                ));
                            }
                        }
                        Action::SettleStale(seq) => {
                            if seq != c.current_seq(slot) {
                                let outcome_before = c.outcome(slot).clone();
                                prop_assert_eq!(
                                    c.on_settled(slot, seq, ok_response()),
                                    SettleDisposition::Superseded
                                );
                                prop_assert_eq!(c.outcome(slot), &outcome_before);
                            }
                        }
                    }
                    prop_assert!(c.current_seq(slot) >= seq_before);
                }
            }
        }
    }
}
