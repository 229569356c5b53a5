//! Per-run counters and the summary block.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Counters accumulated monotonically across all pages of one run.
///
/// Not persisted; reported once when the run summarizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Records returned by the source, duplicates included.
    pub fetched: u64,
    /// Records confirmed written at the destination.
    pub inserted: u64,
    /// Records the destination rejected, plus records without a usable id.
    pub failed: u64,
    /// Records skipped because their id was already at the destination.
    pub skipped_duplicates: u64,
    /// Records deleted from the source after confirmed replication.
    pub deleted: u64,
}

impl RunStats {
    /// Whether the run finished without any per-record failure.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// The final status line: unconditional success or a failure count.
    pub fn status_line(&self) -> String {
        if self.is_clean() {
            "sync completed successfully".to_string()
        } else {
            format!("sync completed with {} failures", self.failed)
        }
    }

    /// The summary block. The deleted line only appears when deletion
    /// was enabled for the run; a run that never deletes should not
    /// report a zero.
    pub fn summary(&self, delete_after_sync: bool) -> String {
        let mut lines = vec![
            format!("total fetched:              {}", self.fetched),
            format!("total inserted:             {}", self.inserted),
            format!("total failed:               {}", self.failed),
            format!("total skipped (duplicates): {}", self.skipped_duplicates),
        ];
        if delete_after_sync {
            lines.push(format!("total deleted from source:  {}", self.deleted));
        }
        lines.join("\n")
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_reflects_failures() {
        let clean = RunStats::default();
        assert!(clean.is_clean());
        assert_eq!(clean.status_line(), "sync completed successfully");

        let dirty = RunStats {
            failed: 3,
            ..RunStats::default()
        };
        assert!(!dirty.is_clean());
        assert_eq!(dirty.status_line(), "sync completed with 3 failures");
    }

    #[test]
    fn summary_lists_every_counter() {
        let stats = RunStats {
            fetched: 10,
            inserted: 7,
            failed: 1,
            skipped_duplicates: 2,
            deleted: 7,
        };
        let rendered = stats.to_string();
        assert!(rendered.contains("total fetched:              10"));
        assert!(rendered.contains("total inserted:             7"));
        assert!(rendered.contains("total failed:               1"));
        assert!(rendered.contains("total skipped (duplicates): 2"));
        assert!(rendered.contains("total deleted from source:  7"));
    }

    #[test]
    fn deleted_line_only_appears_when_deletion_enabled() {
        let stats = RunStats {
            fetched: 10,
            inserted: 10,
            ..RunStats::default()
        };
        assert!(!stats.summary(false).contains("deleted"));
        assert!(stats
            .summary(true)
            .contains("total deleted from source:  0"));
    }
}
