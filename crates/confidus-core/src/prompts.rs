//! Daily visualisation prompts.
//!
//! The prompt for a day is `deck[day_of_year % deck.len()]`, so it is stable
//! for a whole local calendar day and changes only at local midnight.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::ValidationError;

pub const BUILTIN_PROMPTS: [&str; 14] = [
    "a peaceful garden where you feel completely at ease",
    "your ideal future self, living your best life",
    "healing light surrounding and filling your body",
    "a serene beach with gentle waves and warm sand",
    "a mountain peak with a breathtaking view",
    "a cozy cabin in a quiet forest",
    "your happiest memory, reliving every detail",
    "a place where you feel completely safe and loved",
    "your goals and dreams coming true",
    "a field of flowers under a clear blue sky",
    "a warm embrace from someone you love",
    "your body healing and becoming stronger",
    "a calm lake reflecting the sky",
    "success and achievement in your life",
];

/// Days elapsed since "Jan 0" (Dec 31 of the previous year); Jan 1 is 1.
///
/// Computed on calendar dates, so DST shifts cannot move the result.
pub fn day_of_year(date: NaiveDate) -> u32 {
    date.ordinal()
}

/// An ordered, non-empty list of prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDeck {
    prompts: Vec<String>,
}

impl PromptDeck {
    pub fn new(prompts: Vec<String>) -> Result<Self, ValidationError> {
        if prompts.is_empty() {
            return Err(ValidationError::EmptyCollection("prompts".into()));
        }
        if let Some(i) = prompts.iter().position(|p| p.trim().is_empty()) {
            return Err(ValidationError::InvalidValue {
                field: format!("prompts[{i}]"),
                message: "prompt must not be blank".into(),
            });
        }
        Ok(Self { prompts })
    }

    pub fn builtin() -> Self {
        Self {
            prompts: BUILTIN_PROMPTS.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn all(&self) -> &[String] {
        &self.prompts
    }

    pub fn index_for(&self, date: NaiveDate) -> usize {
        day_of_year(date) as usize % self.prompts.len()
    }

    pub fn for_date(&self, date: NaiveDate) -> &str {
        &self.prompts[self.index_for(date)]
    }

    pub fn todays_prompt<C: Clock + ?Sized>(&self, clock: &C) -> &str {
        self.for_date(clock.today())
    }
}

impl Default for PromptDeck {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn jan_first_is_day_one() {
        assert_eq!(day_of_year(date(2025, 1, 1)), 1);
        assert_eq!(day_of_year(date(2025, 12, 31)), 365);
        assert_eq!(day_of_year(date(2024, 12, 31)), 366);
    }

    #[test]
    fn jan_first_picks_index_one() {
        let deck = PromptDeck::builtin();
        assert_eq!(deck.index_for(date(2025, 1, 1)), 1);
        assert_eq!(deck.for_date(date(2025, 1, 1)), BUILTIN_PROMPTS[1]);
    }

    #[test]
    fn day_fifteen_wraps_to_index_one() {
        let deck = PromptDeck::builtin();
        assert_eq!(deck.len(), 14);
        assert_eq!(deck.index_for(date(2025, 1, 15)), 1);
    }

    #[test]
    fn day_fourteen_is_index_zero() {
        let deck = PromptDeck::builtin();
        assert_eq!(deck.for_date(date(2025, 1, 14)), BUILTIN_PROMPTS[0]);
    }

    #[test]
    fn rejects_empty_and_blank() {
        assert_eq!(
            PromptDeck::new(vec![]).unwrap_err(),
            ValidationError::EmptyCollection("prompts".into())
        );
        assert!(PromptDeck::new(vec!["ok".into(), "  ".into()]).is_err());
    }

    #[test]
    fn custom_deck_cycles() {
        let deck = PromptDeck::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        assert_eq!(deck.for_date(date(2025, 1, 1)), "b");
        assert_eq!(deck.for_date(date(2025, 1, 2)), "c");
        assert_eq!(deck.for_date(date(2025, 1, 3)), "a");
    }

    proptest! {
        #[test]
        fn matches_jan_zero_arithmetic(days in 0i64..40_000) {
            let d = date(1970, 1, 1) + chrono::Duration::days(days);
            let jan0 = date(d.year(), 1, 1).pred_opt().unwrap();
            prop_assert_eq!(day_of_year(d) as i64, (d - jan0).num_days());
        }

        #[test]
        fn same_date_same_prompt(days in 0i64..40_000) {
            let deck = PromptDeck::builtin();
            let d = date(1970, 1, 1) + chrono::Duration::days(days);
            prop_assert_eq!(deck.for_date(d), deck.for_date(d));
            prop_assert!(deck.index_for(d) < deck.len());
        }
    }
}
