//! Data models for trajectory aggregation.
//!
//! This module contains the wide and long table representations, the
//! per-position aggregate rows, and the chunk-column naming scheme shared
//! by the loader and the aggregator.

use crate::error::TrajectoryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Naming scheme for chunk columns: a shared prefix followed by an integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkColumns {
    prefix: String,
}

impl ChunkColumns {
    /// Creates a selector for columns named `<prefix><integer>`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns true if the column name carries the chunk prefix.
    pub fn matches(&self, column: &str) -> bool {
        column.starts_with(&self.prefix)
    }

    /// Parse the integer position encoded in a chunk column name.
    ///
    /// Only call this on names for which [`ChunkColumns::matches`] holds.
    pub fn position(&self, column: &str) -> Result<i64, TrajectoryError> {
        column
            .strip_prefix(&self.prefix)
            .and_then(|suffix| suffix.trim().parse::<i64>().ok())
            .ok_or_else(|| TrajectoryError::MalformedColumnName {
                column: column.to_string(),
                prefix: self.prefix.clone(),
            })
    }
}

impl Default for ChunkColumns {
    fn default() -> Self {
        Self::new("chunk_")
    }
}

impl fmt::Display for ChunkColumns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<n>", self.prefix)
    }
}

/// One item (row) of the wide table.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRecord {
    /// Value of the identifier column.
    pub item_id: String,
    /// One cell per value column of the owning table, `None` when missing.
    pub values: Vec<Option<f64>>,
}

/// A wide table: one identifier column plus ordered value columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    /// Name of the identifier column.
    pub id_column: String,
    /// Value column names, in file order.
    pub columns: Vec<String>,
    /// Rows, in file order.
    pub rows: Vec<WideRecord>,
}

impl WideTable {
    /// Creates an empty table with the given schema.
    pub fn new(id_column: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            id_column: id_column.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn push_row(&mut self, item_id: impl Into<String>, values: Vec<Option<f64>>) {
        self.rows.push(WideRecord {
            item_id: item_id.into(),
            values,
        });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One (item, position, value) observation of the long table.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRecord {
    pub item_id: String,
    pub position_index: i64,
    pub value: Option<f64>,
}

/// Aggregate statistics at one chunk position.
///
/// Every statistic is optional: a position with no present values has no
/// mean, and a position with a single value has no sample deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    pub position_index: i64,
    /// Mean of present values at this position.
    pub mean: Option<f64>,
    /// Trailing moving average of `mean`.
    pub smoothed_mean: Option<f64>,
    /// Sample (N - 1) standard deviation of present values.
    pub std_dev: Option<f64>,
    /// `smoothed_mean + std_dev`.
    pub upper: Option<f64>,
    /// `smoothed_mean - std_dev`.
    pub lower: Option<f64>,
}

impl AggregateRow {
    /// Returns `(lower, upper)` when both band edges are defined.
    pub fn band(&self) -> Option<(f64, f64)> {
        Some((self.lower?, self.upper?))
    }
}

/// Result of one aggregation run, consumed by both renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Long-form observations for the per-item overlay.
    pub long_records: Vec<LongRecord>,
    /// Aggregate rows, ascending by position.
    pub rows: Vec<AggregateRow>,
}

impl Trajectory {
    /// Number of distinct items in the long table.
    pub fn item_count(&self) -> usize {
        let mut ids: Vec<&str> = self.long_records.iter().map(|r| r.item_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_position_parsing() {
        let columns = ChunkColumns::default();
        assert!(columns.matches("chunk_3"));
        assert!(!columns.matches("filename"));
        assert_eq!(columns.position("chunk_3").unwrap(), 3);
        assert_eq!(columns.position("chunk_10").unwrap(), 10);
        assert_eq!(columns.position("chunk_-1").unwrap(), -1);
    }

    #[test]
    fn test_chunk_position_malformed() {
        let columns = ChunkColumns::default();
        let err = columns.position("chunk_abc").unwrap_err();
        assert!(matches!(
            err,
            TrajectoryError::MalformedColumnName { ref column, .. } if column == "chunk_abc"
        ));
        assert!(columns.position("chunk_").is_err());
    }

    #[test]
    fn test_custom_prefix() {
        let columns = ChunkColumns::new("decile");
        assert!(columns.matches("decile7"));
        assert_eq!(columns.position("decile7").unwrap(), 7);
        assert_eq!(columns.to_string(), "decile<n>");
    }

    #[test]
    fn test_band_requires_both_edges() {
        let row = AggregateRow {
            position_index: 0,
            mean: Some(1.0),
            smoothed_mean: Some(1.0),
            std_dev: None,
            upper: None,
            lower: None,
        };
        assert_eq!(row.band(), None);

        let row = AggregateRow {
            upper: Some(2.0),
            lower: Some(0.0),
            ..row
        };
        assert_eq!(row.band(), Some((0.0, 2.0)));
    }

    #[test]
    fn test_item_count() {
        let trajectory = Trajectory {
            long_records: vec![
                LongRecord {
                    item_id: "a".to_string(),
                    position_index: 0,
                    value: Some(1.0),
                },
                LongRecord {
                    item_id: "b".to_string(),
                    position_index: 0,
                    value: None,
                },
                LongRecord {
                    item_id: "a".to_string(),
                    position_index: 1,
                    value: Some(2.0),
                },
            ],
            rows: Vec::new(),
        };
        assert_eq!(trajectory.item_count(), 2);
    }
}
