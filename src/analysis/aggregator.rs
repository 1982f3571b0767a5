//! Trajectory reshaping and aggregation.
//!
//! This module turns a wide per-item table into long-form observations and
//! computes the per-position mean, its trailing moving average, and the
//! standard deviation band drawn around it.

use crate::error::TrajectoryError;
use crate::models::{AggregateRow, ChunkColumns, LongRecord, Trajectory, WideTable};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Reshapes wide tables and aggregates them into a [`Trajectory`].
#[derive(Debug, Clone)]
pub struct TrajectoryAggregator {
    columns: ChunkColumns,
    smoothing_window: usize,
}

impl TrajectoryAggregator {
    pub fn new(columns: ChunkColumns, smoothing_window: usize) -> Self {
        Self {
            columns,
            smoothing_window,
        }
    }

    /// Reshape the table and aggregate it with the configured window.
    pub fn run(&self, table: &WideTable) -> Result<Trajectory, TrajectoryError> {
        let long_records = reshape(table, &self.columns)?;
        let rows = aggregate(&long_records, self.smoothing_window)?;
        Ok(Trajectory { long_records, rows })
    }
}

/// Unpivot a wide table into one record per (row, chunk column).
///
/// Columns without the chunk prefix are ignored. Missing cells, including
/// cells past the end of a short row, become records with no value.
pub fn reshape(
    table: &WideTable,
    columns: &ChunkColumns,
) -> Result<Vec<LongRecord>, TrajectoryError> {
    let mut chunk_columns = Vec::new();
    for (idx, name) in table.columns.iter().enumerate() {
        if columns.matches(name) {
            chunk_columns.push((idx, columns.position(name)?));
        }
    }

    debug!(
        "Reshaping {} rows keyed by '{}' x {} chunk columns",
        table.rows.len(),
        table.id_column,
        chunk_columns.len()
    );

    let mut records = Vec::with_capacity(table.rows.len() * chunk_columns.len());
    for row in &table.rows {
        for &(idx, position) in &chunk_columns {
            records.push(LongRecord {
                item_id: row.item_id.clone(),
                position_index: position,
                value: row.values.get(idx).copied().flatten(),
            });
        }
    }

    Ok(records)
}

/// Aggregate long records into one row per position, ascending.
///
/// The band is the smoothed mean plus or minus the raw (unsmoothed)
/// standard deviation at the same position.
pub fn aggregate(
    long_records: &[LongRecord],
    smoothing_window: usize,
) -> Result<Vec<AggregateRow>, TrajectoryError> {
    if smoothing_window < 1 {
        return Err(TrajectoryError::InvalidWindow(smoothing_window));
    }
    if long_records.is_empty() {
        return Err(TrajectoryError::EmptyInput);
    }

    let mut groups: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for record in long_records {
        let values = groups.entry(record.position_index).or_default();
        if let Some(value) = record.value.filter(|v| !v.is_nan()) {
            values.push(value);
        }
    }

    let positions: Vec<i64> = groups.keys().copied().collect();
    let means: Vec<Option<f64>> = groups.values().map(|v| mean(v)).collect();
    let std_devs: Vec<Option<f64>> = groups.values().map(|v| sample_std_dev(v)).collect();
    let smoothed = trailing_mean(&means, smoothing_window);

    let rows = positions
        .into_iter()
        .enumerate()
        .map(|(i, position_index)| {
            let (upper, lower) = match (smoothed[i], std_devs[i]) {
                (Some(center), Some(spread))
                    if (center + spread).is_finite() && (center - spread).is_finite() =>
                {
                    (Some(center + spread), Some(center - spread))
                }
                _ => (None, None),
            };
            AggregateRow {
                position_index,
                mean: means[i],
                smoothed_mean: smoothed[i],
                std_dev: std_devs[i],
                upper,
                lower,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "Aggregated {} records into {} positions (window {})",
        long_records.len(),
        rows.len(),
        smoothing_window
    );

    Ok(rows)
}

/// Arithmetic mean, undefined for an empty slice or a non-finite result.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64).filter(|m| m.is_finite())
}

/// Sample standard deviation (N - 1 denominator), undefined below two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let center = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - center).powi(2)).sum();
    Some((sum_sq / (values.len() - 1) as f64).sqrt()).filter(|s| s.is_finite())
}

/// Trailing moving average that narrows at the start of the series.
///
/// Undefined entries are skipped inside each window; a window with no
/// defined entries yields `None`.
pub fn trailing_mean(series: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    (0..series.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let present: Vec<f64> = series[start..=i].iter().flatten().copied().collect();
            mean(&present)
        })
        .collect()
}

/// Per-item series for overlay lines: `(item_id, [(position, value)])`.
///
/// Items keep their first-appearance order; points are ordered by position.
pub fn group_by_item(long_records: &[LongRecord]) -> Vec<(&str, Vec<(i64, Option<f64>)>)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut grouped: Vec<(&str, Vec<(i64, Option<f64>)>)> = Vec::new();

    for record in long_records {
        let slot = *index.entry(record.item_id.as_str()).or_insert_with(|| {
            grouped.push((record.item_id.as_str(), Vec::new()));
            grouped.len() - 1
        });
        grouped[slot].1.push((record.position_index, record.value));
    }

    for (_, points) in grouped.iter_mut() {
        points.sort_by_key(|(position, _)| *position);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(item_id: &str, position_index: i64, value: Option<f64>) -> LongRecord {
        LongRecord {
            item_id: item_id.to_string(),
            position_index,
            value,
        }
    }

    fn example_table() -> WideTable {
        let mut table = WideTable::new(
            "id",
            vec![
                "chunk_0".to_string(),
                "chunk_1".to_string(),
                "chunk_2".to_string(),
            ],
        );
        table.push_row("a", vec![Some(1.0), Some(2.0), Some(3.0)]);
        table.push_row("b", vec![Some(3.0), Some(4.0), Some(5.0)]);
        table
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value should be defined");
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_reshape_counts() {
        let table = example_table();
        let records = reshape(&table, &ChunkColumns::default()).unwrap();
        assert_eq!(records.len(), 6);

        let mut positions: Vec<i64> = records.iter().map(|r| r.position_index).collect();
        positions.sort_unstable();
        positions.dedup();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_reshape_ignores_other_columns() {
        let mut table = WideTable::new(
            "filename",
            vec!["speaker_count".to_string(), "chunk_1".to_string()],
        );
        table.push_row("x.txt", vec![Some(2.0), Some(0.5)]);

        let records = reshape(&table, &ChunkColumns::default()).unwrap();
        assert_eq!(records, vec![record("x.txt", 1, Some(0.5))]);
    }

    #[test]
    fn test_reshape_keeps_missing_values() {
        let mut table = WideTable::new("id", vec!["chunk_0".to_string(), "chunk_1".to_string()]);
        table.push_row("a", vec![None, Some(1.0)]);
        table.push_row("b", vec![Some(2.0)]);

        let records = reshape(&table, &ChunkColumns::default()).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0], record("a", 0, None));
        assert_eq!(records[3], record("b", 1, None));
    }

    #[test]
    fn test_reshape_malformed_column() {
        let mut table = WideTable::new("id", vec!["chunk_0".to_string(), "chunk_x".to_string()]);
        table.push_row("a", vec![Some(1.0), Some(2.0)]);

        let err = reshape(&table, &ChunkColumns::default()).unwrap_err();
        assert!(matches!(err, TrajectoryError::MalformedColumnName { .. }));
    }

    #[test]
    fn test_aggregate_example() {
        let records = reshape(&example_table(), &ChunkColumns::default()).unwrap();
        let rows = aggregate(&records, 2).unwrap();

        let positions: Vec<i64> = rows.iter().map(|r| r.position_index).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        assert_close(rows[0].mean, 2.0);
        assert_close(rows[1].mean, 3.0);
        assert_close(rows[2].mean, 4.0);

        assert_close(rows[0].smoothed_mean, 2.0);
        assert_close(rows[1].smoothed_mean, 2.5);
        assert_close(rows[2].smoothed_mean, 3.5);

        let spread = 2.0_f64.sqrt();
        assert_close(rows[1].std_dev, spread);
        assert_close(rows[1].upper, 2.5 + spread);
        assert_close(rows[1].lower, 2.5 - spread);
    }

    #[test]
    fn test_aggregate_sorts_numerically() {
        let records = vec![
            record("a", 10, Some(1.0)),
            record("a", 2, Some(2.0)),
            record("a", 1, Some(3.0)),
            record("b", 10, Some(5.0)),
        ];
        let rows = aggregate(&records, 1).unwrap();
        let positions: Vec<i64> = rows.iter().map(|r| r.position_index).collect();
        assert_eq!(positions, vec![1, 2, 10]);
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_window_one_is_identity() {
        let records = vec![
            record("a", 0, Some(0.2)),
            record("b", 0, Some(0.7)),
            record("a", 1, Some(0.1)),
            record("b", 1, None),
            record("a", 2, None),
            record("b", 2, None),
            record("a", 3, Some(0.9)),
        ];
        let rows = aggregate(&records, 1).unwrap();
        for row in &rows {
            assert_eq!(row.smoothed_mean, row.mean);
        }
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let records = vec![
            record("a", 0, Some(0.13)),
            record("b", 0, Some(0.71)),
            record("c", 0, Some(0.29)),
            record("a", 1, Some(0.05)),
            record("b", 1, Some(0.33)),
            record("c", 1, None),
        ];
        let first = aggregate(&records, 3).unwrap();
        let second = aggregate(&records, 3).unwrap();
        assert_eq!(first, second);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.mean.map(f64::to_bits), b.mean.map(f64::to_bits));
            assert_eq!(a.upper.map(f64::to_bits), b.upper.map(f64::to_bits));
        }
    }

    #[test]
    fn test_all_missing_position() {
        let records = vec![
            record("a", 4, Some(1.0)),
            record("b", 4, Some(2.0)),
            record("a", 5, None),
            record("b", 5, None),
        ];
        let rows = aggregate(&records, 1).unwrap();
        let missing = rows.iter().find(|r| r.position_index == 5).unwrap();
        assert_eq!(missing.mean, None);
        assert_eq!(missing.std_dev, None);
        assert_eq!(missing.smoothed_mean, None);
        assert_eq!(missing.upper, None);
        assert_eq!(missing.lower, None);
        assert_eq!(missing.band(), None);
    }

    #[test]
    fn test_missing_mean_skipped_in_window() {
        let records = vec![
            record("a", 0, Some(2.0)),
            record("a", 1, None),
            record("a", 2, Some(4.0)),
        ];
        let rows = aggregate(&records, 2).unwrap();
        assert_close(rows[1].smoothed_mean, 2.0);
        assert_close(rows[2].smoothed_mean, 4.0);

        let rows = aggregate(&records, 3).unwrap();
        assert_close(rows[2].smoothed_mean, 3.0);
    }

    #[test]
    fn test_single_value_has_no_std_dev() {
        let records = vec![record("a", 0, Some(0.4)), record("b", 0, None)];
        let rows = aggregate(&records, 2).unwrap();
        assert_close(rows[0].mean, 0.4);
        assert_eq!(rows[0].std_dev, None);
        assert_eq!(rows[0].upper, None);
        assert_eq!(rows[0].lower, None);
    }

    #[test]
    fn test_nan_treated_as_missing() {
        let records = vec![record("a", 0, Some(f64::NAN)), record("b", 0, Some(1.0))];
        let rows = aggregate(&records, 1).unwrap();
        assert_close(rows[0].mean, 1.0);
        assert_eq!(rows[0].std_dev, None);
    }

    #[test]
    fn test_infinite_values_leave_position_undefined() {
        let records = vec![
            record("a", 0, Some(1.0)),
            record("a", 1, Some(f64::NAN)),
            record("a", 2, Some(f64::INFINITY)),
            record("b", 0, Some(2.0)),
            record("b", 1, Some(3.0)),
            record("b", 2, Some(1.0)),
        ];
        let rows = aggregate(&records, 1).unwrap();

        assert_close(rows[1].mean, 3.0);
        assert_eq!(rows[1].std_dev, None);

        assert_eq!(rows[2].mean, None);
        assert_eq!(rows[2].smoothed_mean, None);
        assert_eq!(rows[2].std_dev, None);
        assert_eq!(rows[2].upper, None);
        assert_eq!(rows[2].lower, None);

        let rows = aggregate(&records, 3).unwrap();
        assert_close(rows[2].smoothed_mean, 2.25);
    }

    #[test]
    fn test_aggregate_errors() {
        assert!(matches!(
            aggregate(&[], 2),
            Err(TrajectoryError::EmptyInput)
        ));

        let records = vec![record("a", 0, Some(1.0))];
        assert!(matches!(
            aggregate(&records, 0),
            Err(TrajectoryError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_trailing_mean_narrows_at_start() {
        let series = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        let smoothed = trailing_mean(&series, 3);
        assert_eq!(smoothed, vec![Some(1.0), Some(1.5), Some(2.0), Some(3.0)]);

        assert_eq!(trailing_mean(&[None, None], 2), vec![None, None]);
    }

    #[test]
    fn test_sample_std_dev() {
        assert_eq!(sample_std_dev(&[]), None);
        assert_eq!(sample_std_dev(&[3.0]), None);
        assert_eq!(sample_std_dev(&[1.0, f64::INFINITY]), None);
        assert_eq!(mean(&[f64::NEG_INFINITY, 1.0]), None);

        // sum of squared deviations is 32 over 7 degrees of freedom
        let spread = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_close(spread, (32.0_f64 / 7.0).sqrt());
    }

    #[test]
    fn test_group_by_item() {
        let records = vec![
            record("b", 1, Some(2.0)),
            record("a", 1, Some(1.0)),
            record("b", 0, None),
            record("a", 0, Some(0.5)),
        ];
        let grouped = group_by_item(&records);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].0, "b");
        assert_eq!(grouped[0].1, vec![(0, None), (1, Some(2.0))]);
        assert_eq!(grouped[1].0, "a");
        assert_eq!(grouped[1].1, vec![(0, Some(0.5)), (1, Some(1.0))]);
    }

    #[test]
    fn test_aggregator_run() {
        let aggregator = TrajectoryAggregator::new(ChunkColumns::default(), 2);
        let trajectory = aggregator.run(&example_table()).unwrap();
        assert_eq!(trajectory.long_records.len(), 6);
        assert_eq!(trajectory.rows.len(), 3);
        assert_eq!(trajectory.item_count(), 2);
    }

    #[test]
    fn test_aggregator_run_without_chunk_columns() {
        let mut table = WideTable::new("id", vec!["notes".to_string()]);
        table.push_row("a", vec![Some(1.0)]);
        let aggregator = TrajectoryAggregator::new(ChunkColumns::default(), 2);
        assert!(matches!(
            aggregator.run(&table),
            Err(TrajectoryError::EmptyInput)
        ));
    }
}
