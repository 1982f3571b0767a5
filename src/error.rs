//! Error types for loading and aggregating trajectories.

use std::path::PathBuf;

/// Errors raised while loading, reshaping or aggregating a table.
///
/// All variants are fatal for a run; the computation is deterministic, so
/// retrying would reproduce the same failure.
#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("Column '{column}' has the chunk prefix '{prefix}' but no integer position")]
    MalformedColumnName { column: String, prefix: String },

    #[error("No records to aggregate")]
    EmptyInput,

    #[error("Smoothing window must be at least 1, got {0}")]
    InvalidWindow(usize),

    #[error("Identifier column '{column}' not found in {}", path.display())]
    MissingIdColumn { column: String, path: PathBuf },

    #[error("Row {row}, column '{column}': '{value}' is not a number")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row} has {found} fields but the header has {expected}")]
    ExtraFields {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
}
