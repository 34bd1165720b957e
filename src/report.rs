//! Check report types.

use crate::policy::FieldDiff;
use std::time::Duration;

/// A single field discrepancy, rendered for display.
#[derive(Debug, Clone)]
pub struct Mismatch {
    /// Record identifier shared by both stores.
    pub id: String,
    /// Field name.
    pub field: String,
    /// Value in the source store.
    pub source: String,
    /// Value in the target store.
    pub target: String,
}

impl Mismatch {
    /// Build a mismatch entry from a field diff.
    pub fn from_diff(id: &str, diff: &FieldDiff, target_row_missing: bool) -> Self {
        let absent = |missing_row: bool| {
            if missing_row {
                "<missing row>".to_string()
            } else {
                "<absent>".to_string()
            }
        };
        Mismatch {
            id: id.to_string(),
            field: diff.field.clone(),
            source: diff
                .source
                .as_ref()
                .map(|v| v.render())
                .unwrap_or_else(|| absent(false)),
            target: diff
                .target
                .as_ref()
                .map(|v| v.render())
                .unwrap_or_else(|| absent(target_row_missing)),
        }
    }
}

/// Result of scanning one table.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// Table that was scanned.
    pub table: String,
    /// Number of source records scanned.
    pub scanned: u64,
    /// Number of records that matched exactly.
    pub matched: u64,
    /// Number of source records with no target counterpart.
    pub missing: u64,
    /// Number of records with at least one field mismatch (includes missing).
    ///
    /// On a truncated scan, counts cover the records visited up to the stop
    /// point, including the record whose remaining field diffs were cut off
    /// by the cap.
    pub mismatched: u64,
    /// Ordered field-level mismatches, capped at the configured maximum.
    pub mismatches: Vec<Mismatch>,
    /// True when the scan stopped early because the cap was reached.
    pub truncated: bool,
    /// Total scan time.
    pub total_duration: Duration,
}

impl CheckReport {
    /// Check if the scanned range was fully equal.
    pub fn is_success(&self) -> bool {
        self.mismatches.is_empty() && !self.truncated
    }

    /// Get a summary string.
    pub fn summary(&self) -> String {
        if self.is_success() {
            format!(
                "Check PASSED for {}: {}/{} rows matched in {:?}",
                self.table, self.matched, self.scanned, self.total_duration
            )
        } else {
            format!(
                "Check FAILED for {}: {} mismatched rows ({} missing) out of {} scanned{}",
                self.table,
                self.mismatched,
                self.missing,
                self.scanned,
                if self.truncated {
                    ", scan stopped at error cap"
                } else {
                    ""
                }
            )
        }
    }

    /// Serialize the report to JSON for `--report-file` emission.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "table": self.table,
            "scanned": self.scanned,
            "matched": self.matched,
            "missing": self.missing,
            "mismatched": self.mismatched,
            "truncated": self.truncated,
            "duration_ms": self.total_duration.as_millis() as u64,
            "mismatches": self
                .mismatches
                .iter()
                .map(|m| {
                    serde_json::json!({
                        "id": m.id,
                        "field": m.field,
                        "source": m.source,
                        "target": m.target,
                    })
                })
                .collect::<Vec<_>>(),
        })
    }
}
