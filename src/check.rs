//! Row equality checker
//!
//! This module provides the table scan that drives a check run: an ordered
//! cursor over the source store, batched fetch-by-id against the target
//! store, and field-by-field comparison under a [`TablePolicy`].
//!
//! # Design Overview
//!
//! The scan is a single logical pass, consumed strictly in source order so
//! the mismatch report is deterministic:
//!
//! 1. Pull the next batch of source records from the cursor
//! 2. Fetch the matching target records by identifier in one round trip
//! 3. Compare each source record under the table policy, in source order
//! 4. Record mismatches until the configured cap is reached
//!
//! Once the report is full, the first mismatch beyond the cap stops the
//! scan entirely and marks the report as truncated; a saturated report
//! already answers "the migration is not consistent", and stopping keeps a
//! full-table scan from running against both production stores for no
//! additional signal. A full but untruncated report means the scan completed
//! with exactly the cap.
//!
//! The checker is read-only against both stores and owns no state between
//! runs, so concurrent runs over the same tables are safe. There is no
//! cancellation contract of its own; wrap [`TableChecker::run`] in
//! `tokio::time::timeout` and drop the partial result to cancel.

use crate::error::CheckError;
use crate::policy::TablePolicy;
use crate::report::{CheckReport, Mismatch};
use crate::types::Record;
use std::collections::HashMap;
use std::time::Instant;

/// Default cap on recorded mismatches.
pub const DEFAULT_MAX_ERRORS: usize = 10;

/// Default number of source records pulled and fetched per round trip.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Ordered cursor over the source store.
///
/// Implementations must yield records ordered by the table's
/// update-timestamp field so a full-table scan is deterministic.
#[async_trait::async_trait]
pub trait SourceCursor: Send {
    /// Get the next batch of records, at most `max`.
    /// An empty batch signals that the cursor is exhausted.
    async fn next_batch(&mut self, max: usize) -> anyhow::Result<Vec<Record>>;
}

/// Batched fetch-by-id against the target store.
#[async_trait::async_trait]
pub trait TargetFetch: Send + Sync {
    /// Fetch the records with the given identifiers.
    /// Identifiers with no target record are absent from the result map.
    async fn fetch_by_ids(
        &self,
        table: &str,
        ids: &[String],
    ) -> anyhow::Result<HashMap<String, Record>>;
}

/// Scans one table and produces a bounded mismatch report.
pub struct TableChecker {
    table: String,
    policy: TablePolicy,
    batch_size: usize,
    max_errors: usize,
}

impl TableChecker {
    /// Create a checker for one table.
    pub fn new(table: impl Into<String>, policy: TablePolicy) -> Self {
        Self {
            table: table.into(),
            policy,
            batch_size: DEFAULT_BATCH_SIZE,
            max_errors: DEFAULT_MAX_ERRORS,
        }
    }

    /// Set the batch size for cursor pulls and target fetches.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the mismatch cap. Must be positive.
    pub fn with_max_errors(mut self, max_errors: usize) -> Result<Self, CheckError> {
        if max_errors == 0 {
            return Err(CheckError::InvalidMaxErrors(max_errors));
        }
        self.max_errors = max_errors;
        Ok(self)
    }

    /// Run the scan.
    ///
    /// Returns the report, or a fatal [`CheckError`] if either store fails.
    /// A missing target record is a mismatch, not a fatal error.
    pub async fn run(
        &self,
        source: &mut dyn SourceCursor,
        target: &dyn TargetFetch,
    ) -> Result<CheckReport, CheckError> {
        let started = Instant::now();
        let mut report = CheckReport {
            table: self.table.clone(),
            ..Default::default()
        };

        tracing::info!(
            "Starting check of table '{}' (batch_size={}, max_errors={})",
            self.table,
            self.batch_size,
            self.max_errors
        );

        'scan: loop {
            let batch = source
                .next_batch(self.batch_size)
                .await
                .map_err(CheckError::Source)?;
            if batch.is_empty() {
                break;
            }
            tracing::debug!(
                "Pulled {} source records from '{}' ({} scanned so far)",
                batch.len(),
                self.table,
                report.scanned
            );

            let ids: Vec<String> = batch.iter().map(|r| r.id.clone()).collect();
            let targets = target
                .fetch_by_ids(&self.table, &ids)
                .await
                .map_err(CheckError::Target)?;

            for record in &batch {
                report.scanned += 1;
                let target_record = targets.get(&record.id);
                let diffs = self.policy.compare_record(record, target_record);

                if diffs.is_empty() {
                    report.matched += 1;
                    continue;
                }

                report.mismatched += 1;
                if target_record.is_none() {
                    report.missing += 1;
                    tracing::warn!("Record '{}' is missing from the target store", record.id);
                }

                for diff in &diffs {
                    if report.mismatches.len() >= self.max_errors {
                        report.truncated = true;
                        tracing::warn!(
                            "Reached mismatch cap ({}) on table '{}', stopping scan",
                            self.max_errors,
                            self.table
                        );
                        break 'scan;
                    }
                    report
                        .mismatches
                        .push(Mismatch::from_diff(&record.id, diff, target_record.is_none()));
                }
            }
        }

        report.total_duration = started.elapsed();
        tracing::info!("{}", report.summary());
        Ok(report)
    }
}
