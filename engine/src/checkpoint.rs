//! The durable sync watermark.
//!
//! Persisted as a single JSON object `{"last_synced": "<ISO-8601>"}`,
//! whichever backing store holds it. The engine treats the value as
//! opaque progress state: read once at run start, written once at run
//! end, no history.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The persisted checkpoint document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub last_synced: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(last_synced: DateTime<Utc>) -> Self {
        Self { last_synced }
    }

    /// The watermark assumed when no checkpoint was ever written.
    pub fn default_watermark(now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(1)
    }
}
