//! # Confidus Core Library
//!
//! This library provides the stateful core of the Confidus daily
//! visualisation exercise. Front-ends (the CLI, or any screen layer) query
//! it for what to show and drive it with user input.
//!
//! ## Architecture
//!
//! - **Completion Tracker**: answers "done today?" and "overdue?" from a
//!   persisted completion record, and records new completions
//! - **Step Sequencer**: a tick-driven state machine for the breathing and
//!   visualisation flow, plus an async driver that owns its timers
//! - **Prompts**: deterministic day-of-year prompt selection
//! - **Storage**: an injected key-value store (SQLite or in-memory) and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`CompletionTracker`]: completion queries and commits
//! - [`VisualisationSession`]: sequencer state machine
//! - [`run_session`]: timer-owning driver loop
//! - [`PromptDeck`]: daily prompt picker
//! - [`Database`]: SQLite key-value persistence
//! - [`Config`]: application configuration management

pub mod clock;
pub mod completion;
pub mod error;
pub mod events;
pub mod prompts;
pub mod sequencer;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use completion::{CompletionRecord, CompletionStatus, CompletionTracker};
pub use error::{ConfigError, CoreError, DatabaseError, PersistenceError, SessionError, ValidationError};
pub use events::SessionEvent;
pub use prompts::{day_of_year, PromptDeck};
pub use sequencer::{
    run_session, AdvancePolicy, Sequence, SessionInput, SessionOutcome, SessionState, Step,
    StepKind, VisualisationSession,
};
pub use storage::{Config, Database, KvStore, MemoryStore};
