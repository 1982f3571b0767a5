//! Aggregate table output for the terminal.

use crate::models::AggregateRow;
use anyhow::Result;

/// Format the aggregate rows as a fixed-width text table.
///
/// Undefined statistics are shown as `-`.
pub fn generate_text_summary(rows: &[AggregateRow]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:>8} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
        "position", "mean", "smoothed", "std_dev", "lower", "upper"
    ));
    output.push_str(&format!("{}\n", "-".repeat(63)));

    for row in rows {
        output.push_str(&format!(
            "{:>8} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            row.position_index,
            cell(row.mean),
            cell(row.smoothed_mean),
            cell(row.std_dev),
            cell(row.lower),
            cell(row.upper)
        ));
    }

    output
}

/// Format the aggregate rows as pretty JSON; undefined statistics are `null`.
pub fn generate_json_summary(rows: &[AggregateRow]) -> Result<String> {
    serde_json::to_string_pretty(rows).map_err(Into::into)
}

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.4}", v),
        None => "-".to_string(),
    }
}
