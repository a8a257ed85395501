//! Async driver for a [`VisualisationSession`].
//!
//! One loop interprets every step the same way: a timed step arms a single
//! `tokio::time::sleep`, a manual step waits for [`SessionInput::Confirm`].
//! The sleep lives inside the loop iteration, so any exit (confirmation,
//! dismissal, the input channel closing) drops it and nothing fires into a
//! closed session.

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use super::session::{SessionOutcome, VisualisationSession};
use crate::clock::Clock;
use crate::completion::CompletionTracker;
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::storage::KvStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    /// The button on a manual step.
    Confirm,
    /// Navigating away from the session.
    Dismiss,
}

/// Run `session` until it closes and return how it ended.
///
/// The driver starts the session itself and measures time from that point.
/// Confirmations that arrive during a timed step are ignored. Dropping the
/// input sender counts as a dismissal.
///
/// # Errors
/// Returns an error if the session was already started.
pub async fn run_session<S: KvStore, C: Clock>(
    mut session: VisualisationSession,
    tracker: &CompletionTracker<S, C>,
    mut inputs: mpsc::Receiver<SessionInput>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
) -> Result<SessionOutcome, SessionError> {
    let origin = Instant::now();
    let elapsed_ms = || saturating_ms(origin.elapsed());
    let emit = |event: SessionEvent| {
        if let Some(tx) = &events {
            // A front-end that stopped listening does not stop the session.
            let _ = tx.send(event);
        }
    };

    emit(session.start(0)?);

    loop {
        if let Some(outcome) = session.outcome() {
            return Ok(outcome.clone());
        }

        let input = match session.pending_deadline_ms() {
            Some(deadline) => {
                let timer = tokio::time::sleep_until(origin + Duration::from_millis(deadline));
                tokio::select! {
                    biased;
                    _ = timer => {
                        if let Some(event) = session.tick(elapsed_ms()) {
                            emit(event);
                        }
                        continue;
                    }
                    input = inputs.recv() => input,
                }
            }
            None => inputs.recv().await,
        };

        match input {
            Some(SessionInput::Confirm) => match session.confirm(elapsed_ms(), tracker) {
                Ok(event) => emit(event),
                Err(err) => tracing::debug!(error = %err, "confirmation ignored"),
            },
            Some(SessionInput::Dismiss) | None => {
                if let Some(event) = session.dismiss(elapsed_ms()) {
                    emit(event);
                }
            }
        }
    }
}

fn saturating_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
