//! Visualisation session state machine.
//!
//! Like the rest of the crate this is driven from outside: the session has
//! no threads or timers of its own. The caller passes a monotonic
//! millisecond reading to `start`, `tick` and `confirm`; a timed step is
//! just a stored deadline that `tick` compares against.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running(step 0 -> 1 -> ... -> last) -> Closed
//!                   \_________ dismiss ________/
//! ```
//!
//! Steps only move forward. The confirmation on the last step is the single
//! terminal action: it records the completion and closes the session even
//! when the write fails.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sequence::{Sequence, Step};
use crate::clock::Clock;
use crate::completion::{CompletionRecord, CompletionTracker};
use crate::error::{PersistenceError, SessionError};
use crate::events::SessionEvent;
use crate::storage::KvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Closed,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    Completed(CompletionRecord),
    /// The user finished but the completion could not be stored.
    CommitFailed(PersistenceError),
    Abandoned { step_index: usize },
}

#[derive(Debug, Clone)]
pub struct VisualisationSession {
    id: Uuid,
    sequence: Sequence,
    prompt: String,
    state: SessionState,
    step_index: usize,
    /// Armed timer of the current step, if it is timed.
    deadline_ms: Option<u64>,
    outcome: Option<SessionOutcome>,
}

impl VisualisationSession {
    /// Create an idle session. The prompt is fixed for its lifetime.
    pub fn new(sequence: Sequence, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            prompt: prompt.into(),
            state: SessionState::Idle,
            step_index: 0,
            deadline_ms: None,
            outcome: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.sequence.get(self.step_index)
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    pub fn pending_deadline_ms(&self) -> Option<u64> {
        self.deadline_ms
    }

    /// Time left on the armed timer, `None` when nothing is armed.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.deadline_ms.map(|d| d.saturating_sub(now_ms))
    }

    /// Whether the current step waits for `confirm`.
    pub fn awaiting_input(&self) -> bool {
        self.state == SessionState::Running
            && self.current_step().is_some_and(|s| !s.is_timed())
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Enter the first step. Only valid once.
    pub fn start(&mut self, now_ms: u64) -> Result<SessionEvent, SessionError> {
        match self.state {
            SessionState::Idle => {}
            SessionState::Running => return Err(SessionError::AlreadyStarted),
            SessionState::Closed => return Err(SessionError::Closed),
        }
        self.state = SessionState::Running;
        self.enter_step(0, now_ms);
        tracing::debug!(session_id = %self.id, "visualisation session started");
        Ok(SessionEvent::SessionStarted {
            session_id: self.id,
            step_index: 0,
            step_kind: self.current_kind(),
            awaiting_input: self.awaiting_input(),
            prompt: self.prompt.clone(),
            at_ms: now_ms,
        })
    }

    /// Call periodically. Fires the armed timer at most once per call.
    ///
    /// The next step's timer runs from the instant this one was due, so a
    /// late tick does not stretch the flow; a further `tick` catches up.
    pub fn tick(&mut self, now_ms: u64) -> Option<SessionEvent> {
        if self.state != SessionState::Running {
            return None;
        }
        let due = self.deadline_ms.filter(|&d| now_ms >= d)?;
        let from = self.step_index;
        let to = from + 1;
        if to >= self.sequence.len() {
            self.deadline_ms = None;
            return None;
        }
        self.enter_step(to, due);
        Some(self.advanced_event(from, due))
    }

    /// The user's confirmation on a manual step.
    ///
    /// On the last step this records the completion through `tracker` and
    /// closes the session whatever the write returns; a failed write comes
    /// back as [`SessionEvent::CommitFailed`] for the caller to log.
    ///
    /// # Errors
    /// Returns an error if the session is not running or the current step
    /// is timed. The session is left unchanged.
    pub fn confirm<S: KvStore, C: Clock>(
        &mut self,
        now_ms: u64,
        tracker: &CompletionTracker<S, C>,
    ) -> Result<SessionEvent, SessionError> {
        match self.state {
            SessionState::Idle => return Err(SessionError::NotStarted),
            SessionState::Closed => return Err(SessionError::Closed),
            SessionState::Running => {}
        }
        if self.current_step().map_or(true, Step::is_timed) {
            return Err(SessionError::NotManual {
                step_index: self.step_index,
            });
        }

        if !self.sequence.is_terminal(self.step_index) {
            let from = self.step_index;
            self.enter_step(from + 1, now_ms);
            return Ok(self.advanced_event(from, now_ms));
        }

        let result = tracker.mark_completed();
        self.close();
        let event = match result {
            Ok(record) => {
                self.outcome = Some(SessionOutcome::Completed(record));
                SessionEvent::SessionCompleted {
                    session_id: self.id,
                    record,
                    at_ms: now_ms,
                }
            }
            Err(err) => {
                tracing::debug!(session_id = %self.id, error = %err, "completion not stored");
                let error = err.to_string();
                self.outcome = Some(SessionOutcome::CommitFailed(err));
                SessionEvent::CommitFailed {
                    session_id: self.id,
                    error,
                    at_ms: now_ms,
                }
            }
        };
        Ok(event)
    }

    /// Abandon the session and disarm any pending timer.
    ///
    /// Returns `None` if the session was already closed.
    pub fn dismiss(&mut self, now_ms: u64) -> Option<SessionEvent> {
        if self.is_closed() {
            return None;
        }
        self.close();
        self.outcome = Some(SessionOutcome::Abandoned {
            step_index: self.step_index,
        });
        tracing::debug!(session_id = %self.id, step_index = self.step_index, "visualisation session abandoned");
        Some(SessionEvent::SessionAbandoned {
            session_id: self.id,
            step_index: self.step_index,
            at_ms: now_ms,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter_step(&mut self, index: usize, entered_ms: u64) {
        self.step_index = index;
        self.deadline_ms = self
            .sequence
            .get(index)
            .and_then(Step::duration_ms)
            .map(|d| entered_ms.saturating_add(d));
        tracing::debug!(session_id = %self.id, step_index = index, "entered step");
    }

    fn close(&mut self) {
        self.state = SessionState::Closed;
        self.deadline_ms = None;
    }

    fn current_kind(&self) -> super::sequence::StepKind {
        self.sequence.steps()[self.step_index].kind
    }

    fn advanced_event(&self, from: usize, at_ms: u64) -> SessionEvent {
        SessionEvent::StepAdvanced {
            from_step: from,
            to_step: self.step_index,
            step_kind: self.current_kind(),
            awaiting_input: self.awaiting_input(),
            at_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sequencer::StepKind;
    use crate::storage::MemoryStore;
    use chrono::DateTime;

    fn tracker() -> CompletionTracker<MemoryStore, ManualClock> {
        let now = DateTime::parse_from_rfc3339("2025-06-01T09:00:00+02:00").unwrap();
        CompletionTracker::new(MemoryStore::new(), ManualClock::new(now))
    }

    fn started(sequence: Sequence) -> VisualisationSession {
        let mut s = VisualisationSession::new(sequence, "a calm lake reflecting the sky");
        s.start(0).unwrap();
        s
    }

    #[test]
    fn starts_in_breathe_in_with_timer_armed() {
        let s = started(Sequence::five_step());
        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.current_step().unwrap().kind, StepKind::BreatheIn);
        assert_eq!(s.pending_deadline_ms(), Some(4000));
        assert_eq!(s.remaining_ms(1500), Some(2500));
        assert!(!s.awaiting_input());
    }

    #[test]
    fn breathe_in_fires_exactly_once() {
        let mut s = started(Sequence::five_step());
        assert!(s.tick(3999).is_none());

        let ev = s.tick(4000).unwrap();
        assert_eq!(
            ev,
            SessionEvent::StepAdvanced {
                from_step: 0,
                to_step: 1,
                step_kind: StepKind::BreatheOut,
                awaiting_input: false,
                at_ms: 4000,
            }
        );
        assert!(s.tick(4000).is_none());
        assert!(s.tick(7999).is_none());
        assert_eq!(s.step_index(), 1);
    }

    #[test]
    fn late_tick_catches_up_one_step_at_a_time() {
        let mut s = started(Sequence::five_step());
        assert!(s.tick(9000).is_some());
        assert_eq!(s.pending_deadline_ms(), Some(8000));
        let ev = s.tick(9000).unwrap();
        assert!(matches!(ev, SessionEvent::StepAdvanced { to_step: 2, awaiting_input: true, .. }));
        assert!(s.tick(100_000).is_none());
        assert_eq!(s.pending_deadline_ms(), None);
    }

    #[test]
    fn dismiss_mid_breath_cancels_timer() {
        let mut s = started(Sequence::five_step());
        assert!(s.tick(2000).is_none());
        let ev = s.dismiss(2000).unwrap();
        assert!(matches!(ev, SessionEvent::SessionAbandoned { step_index: 0, .. }));
        assert_eq!(s.pending_deadline_ms(), None);
        assert!(s.tick(4000).is_none());
        assert!(s.tick(60_000).is_none());
        assert_eq!(s.step_index(), 0);
        assert_eq!(s.outcome(), Some(&SessionOutcome::Abandoned { step_index: 0 }));
        assert!(s.dismiss(5000).is_none());
    }

    #[test]
    fn confirm_rejected_on_timed_step() {
        let t = tracker();
        let mut s = started(Sequence::five_step());
        assert_eq!(
            s.confirm(100, &t).unwrap_err(),
            SessionError::NotManual { step_index: 0 }
        );
        assert_eq!(s.step_index(), 0);
    }

    #[test]
    fn confirm_before_start_and_after_close() {
        let t = tracker();
        let mut s = VisualisationSession::new(Sequence::three_step(), "p");
        assert_eq!(s.confirm(0, &t).unwrap_err(), SessionError::NotStarted);
        s.start(0).unwrap();
        assert_eq!(s.start(1).unwrap_err(), SessionError::AlreadyStarted);
        s.dismiss(1);
        assert_eq!(s.confirm(2, &t).unwrap_err(), SessionError::Closed);
        assert_eq!(s.start(3).unwrap_err(), SessionError::Closed);
    }

    #[test]
    fn five_step_runs_to_completion() {
        let t = tracker();
        let mut s = started(Sequence::five_step());
        s.tick(4000).unwrap();
        s.tick(8000).unwrap();
        assert!(s.awaiting_input());

        let ready = s.confirm(9000, &t).unwrap();
        assert!(matches!(ready, SessionEvent::StepAdvanced { step_kind: StepKind::VisualizationStarting, .. }));
        let starting = s.confirm(9500, &t).unwrap();
        assert!(matches!(starting, SessionEvent::StepAdvanced { step_kind: StepKind::VisualizationActive, .. }));
        assert!(!t.is_completed_today());

        let done = s.confirm(20_000, &t).unwrap();
        assert!(done.is_terminal());
        assert!(matches!(done, SessionEvent::SessionCompleted { .. }));
        assert!(s.is_closed());
        assert!(matches!(s.outcome(), Some(SessionOutcome::Completed(_))));
        assert!(t.is_completed_today());
        assert!(!t.is_overdue());

        assert_eq!(s.confirm(20_001, &t).unwrap_err(), SessionError::Closed);
    }

    #[test]
    fn three_step_commits_on_done() {
        let t = tracker();
        let mut s = started(Sequence::three_step());
        s.tick(4000).unwrap();
        let ev = s.tick(8000).unwrap();
        assert!(matches!(ev, SessionEvent::StepAdvanced { step_kind: StepKind::Visualization, awaiting_input: true, .. }));
        assert!(s.current_step().unwrap().kind.shows_prompt());
        assert_eq!(s.prompt(), "a calm lake reflecting the sky");

        let done = s.confirm(8100, &t).unwrap();
        assert!(matches!(done, SessionEvent::SessionCompleted { .. }));
        assert!(t.is_completed_today());
    }
}
