use std::io::BufRead;

use clap::Args;
use confidus_core::storage::SequenceVariant;
use confidus_core::{
    run_session, Config, Sequence, SessionEvent, SessionInput, SessionOutcome, SystemClock,
    VisualisationSession,
};
use tokio::sync::mpsc;

use super::open_tracker;

#[derive(Args)]
pub struct VisualiseArgs {
    /// Confirm every manual step automatically
    #[arg(long)]
    auto: bool,
    /// Use the three-step flow regardless of config
    #[arg(long)]
    three_step: bool,
    /// Override the length of each breathing step
    #[arg(long)]
    breath_ms: Option<u64>,
    /// Print session events as JSON lines
    #[arg(long)]
    json: bool,
}

pub fn run(args: VisualiseArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if args.three_step {
        config.sequence.variant = SequenceVariant::ThreeStep;
    }
    if let Some(ms) = args.breath_ms {
        config.sequence.breath_ms = ms;
    }
    let sequence = config.sequence()?;
    let deck = config.prompt_deck()?;
    let tracker = open_tracker(&config)?;
    let prompt = deck.todays_prompt(&SystemClock).to_string();
    let session = VisualisationSession::new(sequence.clone(), prompt.clone());

    let (input_tx, input_rx) = mpsc::channel(8);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    // Exactly one live sender: the front-end in auto mode, stdin otherwise.
    let auto_tx = if args.auto {
        Some(input_tx)
    } else {
        let stdin_tx = input_tx;
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let input = match line {
                    Ok(l) if l.trim().eq_ignore_ascii_case("q") => SessionInput::Dismiss,
                    Ok(_) => SessionInput::Confirm,
                    Err(_) => break,
                };
                if stdin_tx.blocking_send(input).is_err() {
                    break;
                }
            }
            // EOF drops the only sender; the session treats that as dismissal.
        });
        None
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let outcome = runtime.block_on(async {
        let front_end = async {
            while let Some(event) = event_rx.recv().await {
                if args.json {
                    match serde_json::to_string(&event) {
                        Ok(line) => println!("{line}"),
                        Err(e) => tracing::warn!(error = %e, "could not encode event"),
                    }
                } else {
                    render(&event, &sequence, &prompt);
                }
                if event.is_terminal() {
                    break;
                }
                if let Some(tx) = &auto_tx {
                    if awaiting_input(&event) && tx.send(SessionInput::Confirm).await.is_err() {
                        break;
                    }
                }
            }
            drop(auto_tx);
        };
        let (outcome, ()) = tokio::join!(run_session(session, &tracker, input_rx, Some(event_tx)), front_end);
        outcome
    })?;

    match outcome {
        SessionOutcome::Completed(_) => {}
        SessionOutcome::CommitFailed(err) => {
            tracing::warn!(error = %err, "visualisation completion was not saved");
        }
        SessionOutcome::Abandoned { step_index } => {
            tracing::info!(step_index, "visualisation abandoned");
        }
    }
    Ok(())
}

fn awaiting_input(event: &SessionEvent) -> bool {
    matches!(
        event,
        SessionEvent::SessionStarted { awaiting_input: true, .. }
            | SessionEvent::StepAdvanced { awaiting_input: true, .. }
    )
}

fn render(event: &SessionEvent, sequence: &Sequence, prompt: &str) {
    let step_at = |index: usize| {
        let Some(step) = sequence.get(index) else {
            return;
        };
        println!("{}", step.label);
        if step.kind.shows_prompt() {
            println!("  {prompt}");
        }
        if let Some(action) = step.action_label() {
            println!("[Enter] {action}    [q] leave");
        }
    };

    match event {
        SessionEvent::SessionStarted { step_index, .. } => step_at(*step_index),
        SessionEvent::StepAdvanced { to_step, .. } => step_at(*to_step),
        SessionEvent::SessionCompleted { .. } => println!("Today's visualisation done"),
        SessionEvent::CommitFailed { .. } => println!("Done, but today's visualisation could not be saved"),
        SessionEvent::SessionAbandoned { .. } => println!("Visualisation left unfinished"),
    }
}
