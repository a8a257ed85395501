use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Length of each breathing step.
pub const DEFAULT_BREATH_MS: u64 = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    BreatheIn,
    BreatheOut,
    VisualizationReady,
    VisualizationStarting,
    VisualizationActive,
    /// Single visualisation step of the three-step flow.
    Visualization,
}

impl StepKind {
    /// Whether the daily prompt is on screen during this step.
    pub fn shows_prompt(self) -> bool {
        !matches!(self, StepKind::BreatheIn | StepKind::BreatheOut)
    }
}

/// How a step hands over to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// A single-shot timer armed on entry.
    Timed { duration_ms: u64 },
    /// A confirmation from the user.
    Manual { action_label: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    pub label: String,
    pub advance: AdvancePolicy,
}

impl Step {
    pub fn timed(kind: StepKind, label: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            kind,
            label: label.into(),
            advance: AdvancePolicy::Timed { duration_ms },
        }
    }

    pub fn manual(kind: StepKind, label: impl Into<String>, action_label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            advance: AdvancePolicy::Manual {
                action_label: action_label.into(),
            },
        }
    }

    pub fn is_timed(&self) -> bool {
        matches!(self.advance, AdvancePolicy::Timed { .. })
    }

    pub fn duration_ms(&self) -> Option<u64> {
        match self.advance {
            AdvancePolicy::Timed { duration_ms } => Some(duration_ms),
            AdvancePolicy::Manual { .. } => None,
        }
    }

    pub fn action_label(&self) -> Option<&str> {
        match &self.advance {
            AdvancePolicy::Manual { action_label } => Some(action_label),
            AdvancePolicy::Timed { .. } => None,
        }
    }
}

/// An ordered, validated list of steps.
///
/// The last step is always manual: its confirmation is the one terminal
/// action that records the completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Step>", into = "Vec<Step>")]
pub struct Sequence {
    steps: Vec<Step>,
}

impl Sequence {
    pub fn new(steps: Vec<Step>) -> Result<Self, ValidationError> {
        let Some(last) = steps.last() else {
            return Err(ValidationError::EmptyCollection("steps".into()));
        };
        if last.is_timed() {
            return Err(ValidationError::InvalidValue {
                field: format!("steps[{}]", steps.len() - 1),
                message: "the final step must wait for confirmation".into(),
            });
        }
        if let Some(i) = steps.iter().position(|s| s.duration_ms() == Some(0)) {
            return Err(ValidationError::InvalidValue {
                field: format!("steps[{i}].duration_ms"),
                message: "timed steps need a positive duration".into(),
            });
        }
        Ok(Self { steps })
    }

    /// Breathe in, breathe out, then three confirmations.
    pub fn five_step() -> Self {
        Self {
            steps: vec![
                Step::timed(StepKind::BreatheIn, "Breathe in...", DEFAULT_BREATH_MS),
                Step::timed(StepKind::BreatheOut, "Breathe out...", DEFAULT_BREATH_MS),
                Step::manual(
                    StepKind::VisualizationReady,
                    "When you're ready, you'll close your eyes and imagine:",
                    "I'm Ready",
                ),
                Step::manual(
                    StepKind::VisualizationStarting,
                    "Close your eyes for 3 breath cycles and imagine:",
                    "I'm Starting",
                ),
                Step::manual(
                    StepKind::VisualizationActive,
                    "Stay with the image for a moment.",
                    "I'm Done",
                ),
            ],
        }
    }

    /// Breathe in, breathe out, then the prompt with a single "Done".
    pub fn three_step() -> Self {
        Self {
            steps: vec![
                Step::timed(StepKind::BreatheIn, "Breathe in...", DEFAULT_BREATH_MS),
                Step::timed(StepKind::BreatheOut, "Breathe out...", DEFAULT_BREATH_MS),
                Step::manual(
                    StepKind::Visualization,
                    "Close your eyes for 3 breath cycles and imagine:",
                    "Done",
                ),
            ],
        }
    }

    /// Same steps with every timed step set to `breath_ms`.
    pub fn with_breath_ms(mut self, breath_ms: u64) -> Result<Self, ValidationError> {
        for step in &mut self.steps {
            if let AdvancePolicy::Timed { duration_ms } = &mut step.advance {
                *duration_ms = breath_ms;
            }
        }
        Self::new(self.steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn is_terminal(&self, index: usize) -> bool {
        index == self.last_index()
    }

    /// Time spent in timed steps before the first confirmation is possible.
    pub fn total_timed_ms(&self) -> u64 {
        self.steps.iter().filter_map(Step::duration_ms).sum()
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::five_step()
    }
}

impl TryFrom<Vec<Step>> for Sequence {
    type Error = ValidationError;

    fn try_from(steps: Vec<Step>) -> Result<Self, Self::Error> {
        Self::new(steps)
    }
}

impl From<Sequence> for Vec<Step> {
    fn from(sequence: Sequence) -> Self {
        sequence.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        assert!(Sequence::new(Sequence::five_step().steps().to_vec()).is_ok());
        assert!(Sequence::new(Sequence::three_step().steps().to_vec()).is_ok());
    }

    #[test]
    fn five_step_shape() {
        let s = Sequence::five_step();
        let kinds: Vec<StepKind> = s.steps().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::BreatheIn,
                StepKind::BreatheOut,
                StepKind::VisualizationReady,
                StepKind::VisualizationStarting,
                StepKind::VisualizationActive,
            ]
        );
        assert_eq!(s.total_timed_ms(), 8000);
        assert_eq!(s.steps()[4].action_label(), Some("I'm Done"));
        assert!(s.is_terminal(4));
    }

    #[test]
    fn three_step_shape() {
        let s = Sequence::three_step();
        assert_eq!(s.len(), 3);
        assert_eq!(s.steps()[2].action_label(), Some("Done"));
        assert!(s.steps()[2].kind.shows_prompt());
        assert!(!s.steps()[0].kind.shows_prompt());
    }

    #[test]
    fn rejects_timed_final_step() {
        let err = Sequence::new(vec![Step::timed(StepKind::BreatheIn, "in", 10)]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidValue { .. }));
    }

    #[test]
    fn rejects_empty_and_zero_duration() {
        assert!(Sequence::new(vec![]).is_err());
        assert!(Sequence::five_step().with_breath_ms(0).is_err());
    }

    #[test]
    fn with_breath_ms_leaves_manual_steps_alone() {
        let s = Sequence::three_step().with_breath_ms(250).unwrap();
        assert_eq!(s.steps()[0].duration_ms(), Some(250));
        assert_eq!(s.steps()[1].duration_ms(), Some(250));
        assert_eq!(s.steps()[2].duration_ms(), None);
    }

    #[test]
    fn deserialize_validates() {
        let json = r#"[{"kind":"breathe_in","label":"in","advance":{"kind":"timed","duration_ms":10}}]"#;
        assert!(serde_json::from_str::<Sequence>(json).is_err());

        let json = r#"[{"kind":"visualization","label":"go","advance":{"kind":"manual","action_label":"Done"}}]"#;
        let s: Sequence = serde_json::from_str(json).unwrap();
        assert_eq!(s.len(), 1);
    }
}
