//! Daily visualisation completion tracking.
//!
//! Two keys in the injected [`KvStore`] make up the completion record:
//!
//! | Key | Value |
//! |---|---|
//! | `lastVisualisationDate` | `YYYY-MM-DD`, local date of the last completion |
//! | `lastVisualisationTimestamp` | epoch milliseconds of the last completion |
//!
//! "Completed today" compares dates, so a session that runs across midnight
//! does not drift. "Overdue" compares instants against a 24h window, which
//! "today" is too coarse for.
//!
//! Queries never fail: a broken read means "not completed" and "overdue",
//! the states that keep the reminder visible. Writes propagate their error.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::PersistenceError;
use crate::storage::KvStore;

pub const DEFAULT_NAMESPACE: &str = "@confidus:";
pub const DATE_KEY: &str = "lastVisualisationDate";
pub const TIMESTAMP_KEY: &str = "lastVisualisationTimestamp";

/// Strictly more than this since the last completion is overdue.
pub const OVERDUE_AFTER_MS: i64 = 24 * 60 * 60 * 1000;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub date: NaiveDate,
    /// Missing for records written before timestamps were stored.
    pub timestamp_ms: Option<i64>,
}

impl CompletionRecord {
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp_ms.and_then(DateTime::from_timestamp_millis)
    }
}

/// Everything a screen needs to render the visualisation entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionStatus {
    pub completed_today: bool,
    pub overdue: bool,
    pub last: Option<CompletionRecord>,
}

pub struct CompletionTracker<S, C> {
    store: S,
    clock: C,
    date_key: String,
    timestamp_key: String,
}

impl<S: KvStore, C: Clock> CompletionTracker<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self::with_namespace(store, clock, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(store: S, clock: C, namespace: &str) -> Self {
        Self {
            store,
            clock,
            date_key: format!("{namespace}{DATE_KEY}"),
            timestamp_key: format!("{namespace}{TIMESTAMP_KEY}"),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn date_key(&self) -> &str {
        &self.date_key
    }

    pub fn timestamp_key(&self) -> &str {
        &self.timestamp_key
    }

    /// Whether the stored completion date equals today's local date.
    pub fn is_completed_today(&self) -> bool {
        let today = self.clock.today().format(DATE_FORMAT).to_string();
        match self.store.get(&self.date_key) {
            Ok(Some(last)) => last.trim() == today,
            Ok(None) => false,
            Err(err) => {
                tracing::debug!(error = %err, "completion date unreadable, treating as not completed");
                false
            }
        }
    }

    /// Whether more than 24h have passed since the last completion.
    pub fn is_overdue(&self) -> bool {
        let raw = match self.store.get(&self.timestamp_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return true,
            Err(err) => {
                tracing::debug!(error = %err, "completion timestamp unreadable, treating as overdue");
                return true;
            }
        };
        match raw.trim().parse::<i64>() {
            Ok(last_ms) => self.clock.now_ms().saturating_sub(last_ms) > OVERDUE_AFTER_MS,
            Err(_) => true,
        }
    }

    /// Record a completion at the current instant.
    ///
    /// Both keys are written together or not at all.
    ///
    /// # Errors
    /// Returns the store's write failure; the previous record is untouched.
    pub fn mark_completed(&self) -> Result<CompletionRecord, PersistenceError> {
        let now = self.clock.now();
        let record = CompletionRecord {
            date: now.date_naive(),
            timestamp_ms: Some(now.timestamp_millis()),
        };
        let date = record.date.format(DATE_FORMAT).to_string();
        let timestamp = now.timestamp_millis().to_string();
        self.store.set_many(&[
            (self.date_key.as_str(), date.as_str()),
            (self.timestamp_key.as_str(), timestamp.as_str()),
        ])?;
        tracing::debug!(date = %date, timestamp_ms = %timestamp, "visualisation completed");
        Ok(record)
    }

    /// Date of the last completion, `None` if absent or unreadable.
    pub fn last_completion_date(&self) -> Option<NaiveDate> {
        let raw = self.store.get(&self.date_key).ok()??;
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
    }

    /// Strict read of the whole record.
    ///
    /// # Errors
    /// Returns a read failure if the store fails or a value is malformed.
    pub fn record(&self) -> Result<Option<CompletionRecord>, PersistenceError> {
        let Some(raw_date) = self.store.get(&self.date_key)? else {
            return Ok(None);
        };
        let date = NaiveDate::parse_from_str(raw_date.trim(), DATE_FORMAT)
            .map_err(|e| PersistenceError::read(&self.date_key, format!("malformed date: {e}")))?;
        let timestamp_ms = match self.store.get(&self.timestamp_key)? {
            Some(raw) => Some(raw.trim().parse::<i64>().map_err(|e| {
                PersistenceError::read(&self.timestamp_key, format!("malformed timestamp: {e}"))
            })?),
            None => None,
        };
        Ok(Some(CompletionRecord { date, timestamp_ms }))
    }

    /// The three values a screen shows, each with its own failure policy.
    pub fn status(&self) -> CompletionStatus {
        CompletionStatus {
            completed_today: self.is_completed_today(),
            overdue: self.is_overdue(),
            last: self.record().ok().flatten(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use chrono::{DateTime, Duration, FixedOffset};

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn tracker(now: &str) -> CompletionTracker<MemoryStore, ManualClock> {
        CompletionTracker::new(MemoryStore::new(), ManualClock::new(at(now)))
    }

    #[test]
    fn fresh_store_is_not_completed_and_overdue() {
        let t = tracker("2025-06-01T09:00:00+01:00");
        assert!(!t.is_completed_today());
        assert!(t.is_overdue());
        assert!(t.last_completion_date().is_none());
        assert_eq!(t.record().unwrap(), None);
    }

    #[test]
    fn mark_completed_writes_both_keys() {
        let t = tracker("2025-06-01T09:00:00+01:00");
        let record = t.mark_completed().unwrap();

        let snap = t.store().snapshot();
        assert_eq!(
            snap.get("@confidus:lastVisualisationDate").map(String::as_str),
            Some("2025-06-01")
        );
        assert_eq!(
            snap.get("@confidus:lastVisualisationTimestamp").cloned(),
            Some(at("2025-06-01T09:00:00+01:00").timestamp_millis().to_string())
        );
        assert_eq!(t.record().unwrap(), Some(record));
        assert!(t.is_completed_today());
        assert!(!t.is_overdue());
    }

    #[test]
    fn rollover_at_local_midnight() {
        let t = tracker("2025-06-01T23:59:00+01:00");
        t.mark_completed().unwrap();
        assert!(t.is_completed_today());

        t.clock().advance(Duration::minutes(2));
        assert!(!t.is_completed_today());
        assert!(!t.is_overdue());
    }

    #[test]
    fn overdue_boundary_is_strict() {
        let t = tracker("2025-06-01T12:00:00Z");
        t.mark_completed().unwrap();

        t.clock().advance_ms(OVERDUE_AFTER_MS - 1);
        assert!(!t.is_overdue());
        t.clock().advance_ms(1);
        assert!(!t.is_overdue());
        t.clock().advance_ms(1);
        assert!(t.is_overdue());
    }

    #[test]
    fn date_only_legacy_record() {
        let t = tracker("2025-06-01T09:00:00Z");
        t.store()
            .set("@confidus:lastVisualisationDate", "2025-06-01")
            .unwrap();
        assert!(t.is_completed_today());
        assert!(t.is_overdue());
        assert_eq!(
            t.record().unwrap(),
            Some(CompletionRecord {
                date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                timestamp_ms: None,
            })
        );
    }

    #[test]
    fn stored_date_with_whitespace_still_counts() {
        let t = tracker("2025-06-01T09:00:00Z");
        t.store()
            .set("@confidus:lastVisualisationDate", "2025-06-01\n")
            .unwrap();
        let status = t.status();
        assert!(status.completed_today);
        assert_eq!(status.last.map(|r| r.date), Some(t.clock().today()));
    }

    #[test]
    fn malformed_timestamp_is_overdue() {
        let t = tracker("2025-06-01T09:00:00Z");
        t.store()
            .set("@confidus:lastVisualisationTimestamp", "yesterday")
            .unwrap();
        assert!(t.is_overdue());
        t.store()
            .set("@confidus:lastVisualisationDate", "2025-06-01")
            .unwrap();
        assert!(matches!(t.record(), Err(PersistenceError::Read { .. })));
        assert!(t.status().last.is_none());
    }

    #[test]
    fn namespace_prefixes_keys() {
        let t = CompletionTracker::with_namespace(
            MemoryStore::new(),
            ManualClock::new(at("2025-06-01T09:00:00Z")),
            "test:",
        );
        t.mark_completed().unwrap();
        assert_eq!(t.date_key(), "test:lastVisualisationDate");
        assert!(t.store().snapshot().contains_key("test:lastVisualisationTimestamp"));
    }

    #[test]
    fn status_bundles_queries() {
        let t = tracker("2025-06-01T09:00:00Z");
        let before = t.status();
        assert!(!before.completed_today);
        assert!(before.overdue);
        assert!(before.last.is_none());

        let record = t.mark_completed().unwrap();
        let after = t.status();
        assert!(after.completed_today);
        assert!(!after.overdue);
        assert_eq!(after.last, Some(record));
        assert_eq!(
            record.completed_at().unwrap(),
            at("2025-06-01T09:00:00Z").with_timezone(&Utc)
        );
    }
}
