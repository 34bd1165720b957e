//! Error types for the row equality checker.

use thiserror::Error;

/// Errors that can occur during a check run.
///
/// Data-level discrepancies are never errors; they are recorded in the
/// [`crate::report::CheckReport`]. These variants cover the fatal cases only.
#[derive(Error, Debug)]
pub enum CheckError {
    /// Reading from the source store failed. Fatal; the scan does not retry.
    #[error("Source store error: {0}")]
    Source(#[source] anyhow::Error),

    /// Fetching from the target store failed. Fatal; the scan does not retry.
    #[error("Target store error: {0}")]
    Target(#[source] anyhow::Error),

    /// No built-in check is registered under this table name.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// The maximum error count must be positive.
    #[error("Invalid max error count: {0}")]
    InvalidMaxErrors(usize),
}
