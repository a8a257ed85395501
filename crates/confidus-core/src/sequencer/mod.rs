mod driver;
mod sequence;
mod session;

pub use driver::{run_session, SessionInput};
pub use sequence::{AdvancePolicy, Sequence, Step, StepKind, DEFAULT_BREATH_MS};
pub use session::{SessionOutcome, SessionState, VisualisationSession};
