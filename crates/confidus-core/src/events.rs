use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::completion::CompletionRecord;
use crate::sequencer::StepKind;

/// Every state change of a visualisation session produces an event.
///
/// `at_ms` is the monotonic reading the session was driven with, not wall
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionStarted {
        session_id: Uuid,
        step_index: usize,
        step_kind: StepKind,
        awaiting_input: bool,
        prompt: String,
        at_ms: u64,
    },
    StepAdvanced {
        from_step: usize,
        to_step: usize,
        step_kind: StepKind,
        /// The new step waits for a confirmation rather than a timer.
        awaiting_input: bool,
        at_ms: u64,
    },
    SessionCompleted {
        session_id: Uuid,
        record: CompletionRecord,
        at_ms: u64,
    },
    /// The terminal action ran but the completion was not stored.
    /// The session is closed regardless.
    CommitFailed {
        session_id: Uuid,
        error: String,
        at_ms: u64,
    },
    SessionAbandoned {
        session_id: Uuid,
        step_index: usize,
        at_ms: u64,
    },
}

impl SessionEvent {
    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::SessionCompleted { .. }
                | SessionEvent::CommitFailed { .. }
                | SessionEvent::SessionAbandoned { .. }
        )
    }
}
