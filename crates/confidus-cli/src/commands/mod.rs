pub mod config;
pub mod prompt;
pub mod status;
pub mod visualise;

use confidus_core::{CompletionTracker, Config, Database, SystemClock};

/// Tracker over the on-disk database, keyed with the configured namespace.
pub fn open_tracker(config: &Config) -> Result<CompletionTracker<Database, SystemClock>, Box<dyn std::error::Error>> {
    let db = Database::open()?;
    Ok(CompletionTracker::with_namespace(db, SystemClock, &config.namespace))
}
