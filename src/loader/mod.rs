//! CSV loading for wide chunk tables.
//!
//! The header row is validated up front: the identifier column must be
//! present and every column carrying the chunk prefix must encode an
//! integer position. Other columns are skipped.

use crate::error::TrajectoryError;
use crate::models::{ChunkColumns, WideTable};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Cell contents read as "no value".
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Column layout expected in the input table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Name of the identifier column.
    pub id_column: String,
    /// Chunk column naming scheme.
    pub columns: ChunkColumns,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            id_column: "filename".to_string(),
            columns: ChunkColumns::default(),
        }
    }
}

impl From<&crate::config::TableConfig> for TableSchema {
    fn from(config: &crate::config::TableConfig) -> Self {
        Self {
            id_column: config.id_column.clone(),
            columns: ChunkColumns::new(config.chunk_prefix.clone()),
        }
    }
}

/// Load a wide table from a CSV file.
pub fn load_wide_table(path: &Path, schema: &TableSchema) -> Result<WideTable, TrajectoryError> {
    info!("Loading table from: {}", path.display());

    let file = File::open(path).map_err(|source| TrajectoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    read_wide_table(BufReader::new(file), schema, path)
}

/// Read a wide table from any CSV source. `source` is only used in errors.
pub fn read_wide_table<R: Read>(
    reader: R,
    schema: &TableSchema,
    source: &Path,
) -> Result<WideTable, TrajectoryError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers()?.clone();

    let id_idx = headers
        .iter()
        .position(|h| h == schema.id_column)
        .ok_or_else(|| TrajectoryError::MissingIdColumn {
            column: schema.id_column.clone(),
            path: source.to_path_buf(),
        })?;

    // (csv index, column name)
    let mut value_columns: Vec<(usize, String)> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        if idx == id_idx {
            continue;
        }
        if schema.columns.matches(name) {
            schema.columns.position(name)?;
            value_columns.push((idx, name.to_string()));
        } else {
            debug!("Skipping non-chunk column: {}", name);
        }
    }

    if value_columns.is_empty() {
        warn!(
            "No columns matching {} found in {}",
            schema.columns,
            source.display()
        );
    }

    let mut table = WideTable::new(
        schema.id_column.clone(),
        value_columns.iter().map(|(_, name)| name.clone()).collect(),
    );
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let row = row_idx + 1;

        // Short rows are padded with missing cells; long rows are rejected.
        if record.len() > headers.len() {
            return Err(TrajectoryError::ExtraFields {
                row,
                expected: headers.len(),
                found: record.len(),
            });
        }

        let item_id = record.get(id_idx).unwrap_or_default().to_string();
        *seen.entry(item_id.clone()).or_default() += 1;

        let values = value_columns
            .iter()
            .map(|(idx, name)| {
                let raw = record.get(*idx).unwrap_or_default();
                parse_cell(raw).ok_or_else(|| TrajectoryError::InvalidValue {
                    row,
                    column: name.clone(),
                    value: raw.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        table.push_row(item_id, values);
    }

    let duplicates = seen.values().filter(|count| **count > 1).count();
    if duplicates > 0 {
        warn!(
            "{} identifier value(s) in column '{}' appear on more than one row",
            duplicates, schema.id_column
        );
    }

    info!(
        "Loaded {} rows with {} chunk columns",
        table.len(),
        table.columns.len()
    );

    Ok(table)
}

/// Parse one cell: `Some(None)` for a missing value, `None` if unparseable.
///
/// Any spelling that parses to NaN counts as missing.
fn parse_cell(raw: &str) -> Option<Option<f64>> {
    let trimmed = raw.trim();
    if NA_VALUES.contains(&trimmed) {
        return Some(None);
    }
    let value = trimmed.parse::<f64>().ok()?;
    Some(Some(value).filter(|v| !v.is_nan()))
}
