use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Date64Array, Float32Array, Float64Array,
    Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::model::{CallDataset, CellValue, Record, DATE_COLUMN, GROUP_COLUMN};

// ---------------------------------------------------------------------------
// Error boundary
// ---------------------------------------------------------------------------

/// Loader failures, each recovered at the UI boundary into an empty dataset
/// plus a status message. Never fatal to the caller.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {0}")]
    SourceNotFound(String),
    #[error("could not parse source: {0}")]
    SchemaParse(String),
    #[error("unexpected error while loading: {0}")]
    Unexpected(String),
}

// ---------------------------------------------------------------------------
// Column schema
// ---------------------------------------------------------------------------

/// Expected semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
    Date,
}

/// Expected kinds for the columns the dashboards know about. Unknown columns
/// fall back to type guessing.
pub fn expected_kind(column: &str) -> Option<ColumnKind> {
    match column {
        "Name" | "Employee ID" | "Group" | "Team leader" | "Supervisor" | "Work mode"
        | "Classification" | "Channel type" => Some(ColumnKind::Text),
        "Talk duration" | "Dialing quantity" | "Dialing connected" | "SMS quantity"
        | "Collected assigned" | "Collected principal" | "Actual collected" => {
            Some(ColumnKind::Number)
        }
        DATE_COLUMN => Some(ColumnKind::Date),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a call-center dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with column names, one record per row
/// * `.json`    – `[{ "Date": "...", "Group": "...", ... }, ...]`
/// * `.parquet` – flat scalar columns (exports from Pandas/Polars)
///
/// When `columns` is given, only those columns are kept; requested columns
/// absent from the source are simply omitted, not an error. Rows without a
/// parseable date or without a primary grouping value are dropped here.
pub fn load_file(path: &Path, columns: Option<&[String]>) -> Result<CallDataset, LoadError> {
    if !path.exists() {
        return Err(LoadError::SourceNotFound(path.display().to_string()));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let requested: Option<BTreeSet<&str>> =
        columns.map(|cols| cols.iter().map(String::as_str).collect());

    let result = match ext.as_str() {
        "csv" => load_csv(path, requested.as_ref()),
        "json" => load_json(path, requested.as_ref()),
        "parquet" | "pq" => load_parquet(path, requested.as_ref()),
        other => {
            return Err(LoadError::SchemaParse(format!(
                "unsupported file extension: .{other}"
            )))
        }
    };

    match result {
        Ok(records) => {
            let dataset = CallDataset::from_records(records);
            log::info!(
                "Loaded {} records with columns {:?} from {}",
                dataset.len(),
                dataset.column_names,
                path.display()
            );
            Ok(dataset)
        }
        Err(e) if e.downcast_ref::<std::io::Error>().is_some() => {
            Err(LoadError::Unexpected(format!("{e:#}")))
        }
        Err(e) => Err(LoadError::SchemaParse(format!("{e:#}"))),
    }
}

// ---------------------------------------------------------------------------
// Memoizing cache
// ---------------------------------------------------------------------------

/// Memoizes parsed datasets keyed by (source path, requested columns) so
/// repeated interactions against the same source skip re-parsing.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: HashMap<(PathBuf, Vec<String>), Arc<CallDataset>>,
    hits: usize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(
        &mut self,
        path: &Path,
        columns: Option<&[String]>,
    ) -> Result<Arc<CallDataset>, LoadError> {
        let key = (
            path.to_path_buf(),
            columns.map(<[String]>::to_vec).unwrap_or_default(),
        );
        if let Some(dataset) = self.entries.get(&key) {
            self.hits += 1;
            log::debug!("Dataset cache hit #{} for {}", self.hits, path.display());
            return Ok(Arc::clone(dataset));
        }
        let dataset = Arc::new(load_file(path, columns)?);
        self.entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }
}

// ---------------------------------------------------------------------------
// Row assembly shared by all formats
// ---------------------------------------------------------------------------

/// Accepted textual date layouts, tried in order.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d/%b/%Y", "%d-%b-%Y"];

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // Datetime exports: keep the calendar date, drop the time of day.
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Coerce a raw textual cell according to the column's expected kind.
fn coerce_text(column: &str, raw: &str) -> CellValue {
    if raw.trim().is_empty() {
        return CellValue::Null;
    }
    guess_or_coerce(expected_kind(column), raw)
}

fn guess_cell_type(s: &str) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Number(f);
    }
    if let Some(d) = parse_date_text(s) {
        return CellValue::Date(d);
    }
    CellValue::Text(s.to_string())
}

/// Turn a raw cell map into a [`Record`], normalizing the date column and
/// dropping rows without a date or a primary grouping value.
fn finish_row(mut cells: BTreeMap<String, CellValue>) -> Option<Record> {
    let date = match cells.remove(DATE_COLUMN) {
        Some(CellValue::Date(d)) => d,
        Some(CellValue::Text(s)) => parse_date_text(&s)?,
        _ => return None,
    };
    match cells.get(GROUP_COLUMN) {
        Some(CellValue::Text(s)) if !s.is_empty() => {}
        _ => return None,
    }
    Some(Record { date, cells })
}

fn keep_column(column: &str, requested: Option<&BTreeSet<&str>>) -> bool {
    // The date column always rides along; it is consumed by finish_row.
    column == DATE_COLUMN || requested.is_none_or(|set| set.contains(column))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, requested: Option<&BTreeSet<&str>>) -> Result<Vec<Record>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if !headers.iter().any(|h| h == DATE_COLUMN) {
        bail!("CSV missing '{DATE_COLUMN}' column");
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let mut cells = BTreeMap::new();
        for (idx, raw) in row.iter().enumerate() {
            let Some(column) = headers.get(idx) else {
                continue;
            };
            if !keep_column(column, requested) {
                continue;
            }
            cells.insert(column.clone(), coerce_text(column, raw));
        }
        if let Some(rec) = finish_row(cells) {
            records.push(rec);
        }
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default
/// `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Date": "2025-10-01", "Group": "A", "Talk duration": 12.5, ... },
///   ...
/// ]
/// ```
fn load_json(path: &Path, requested: Option<&BTreeSet<&str>>) -> Result<Vec<Record>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut cells = BTreeMap::new();
        for (column, val) in obj {
            if !keep_column(column, requested) {
                continue;
            }
            let cell = match val {
                JsonValue::String(s) => coerce_text(column, s),
                JsonValue::Number(n) => n
                    .as_f64()
                    .map(CellValue::Number)
                    .unwrap_or_else(|| CellValue::Text(n.to_string())),
                JsonValue::Bool(b) => CellValue::Text(b.to_string()),
                JsonValue::Null => CellValue::Null,
                other => CellValue::Text(other.to_string()),
            };
            cells.insert(column.clone(), cell);
        }
        if let Some(rec) = finish_row(cells) {
            records.push(rec);
        }
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat scalar columns. Works with files written by
/// both **Pandas** (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path, requested: Option<&BTreeSet<&str>>) -> Result<Vec<Record>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let kept: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| keep_column(f.name(), requested))
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..batch.num_rows() {
            let mut cells = BTreeMap::new();
            for (col_idx, column) in &kept {
                let value = extract_cell(batch.column(*col_idx), expected_kind(column), row);
                cells.insert(column.clone(), value);
            }
            if let Some(rec) = finish_row(cells) {
                records.push(rec);
            }
        }
    }
    Ok(records)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, hint: Option<ColumnKind>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 => {
            let raw = if let Some(s) = col.as_any().downcast_ref::<StringArray>() {
                s.value(row).to_string()
            } else {
                // LargeStringArray
                col.as_string::<i64>().value(row).to_string()
            };
            guess_or_coerce(hint, &raw)
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            CellValue::Number(arr.value(row) as f64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            CellValue::Number(arr.value(row) as f64)
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            CellValue::Number(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            CellValue::Number(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            CellValue::Text(arr.value(row).to_string())
        }
        DataType::Date32 => {
            let arr = col.as_any().downcast_ref::<Date32Array>().unwrap();
            let days = arr.value(row) as i64;
            match DateTime::from_timestamp(days * 86_400, 0) {
                Some(dt) => CellValue::Date(dt.date_naive()),
                None => CellValue::Null,
            }
        }
        DataType::Date64 => {
            let arr = col.as_any().downcast_ref::<Date64Array>().unwrap();
            let millis = arr.value(row);
            match DateTime::from_timestamp_millis(millis) {
                Some(dt) => CellValue::Date(dt.date_naive()),
                None => CellValue::Null,
            }
        }
        _ => CellValue::Null,
    }
}

fn guess_or_coerce(hint: Option<ColumnKind>, raw: &str) -> CellValue {
    match hint {
        Some(ColumnKind::Text) => {
            if raw.is_empty() {
                CellValue::Null
            } else {
                CellValue::Text(raw.to_string())
            }
        }
        Some(ColumnKind::Number) => raw
            .trim()
            .parse::<f64>()
            .map(CellValue::Number)
            .unwrap_or_else(|_| CellValue::Text(raw.to_string())),
        Some(ColumnKind::Date) => parse_date_text(raw)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        None => guess_cell_type(raw),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut tmp = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(tmp, "{contents}").unwrap();
        tmp
    }

    const SAMPLE_CSV: &str = "\
Date,Group,Team leader,Talk duration
2025-10-01,A,Tina,12.5
2025-10-02,A,Tom,7.0
2025-10-02,B,Bea,3.25
";

    #[test]
    fn csv_load_builds_typed_records() {
        let tmp = csv_file(SAMPLE_CSV);
        let ds = load_file(tmp.path(), None).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(
            ds.column_names,
            vec!["Group", "Talk duration", "Team leader"]
        );
        let first = &ds.records[0];
        assert_eq!(
            first.date,
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap()
        );
        assert_eq!(first.cell("Talk duration").as_f64(), Some(12.5));
    }

    #[test]
    fn rows_without_group_or_date_are_dropped() {
        let tmp = csv_file(
            "Date,Group,Talk duration\n\
             2025-10-01,A,1.0\n\
             not-a-date,B,2.0\n\
             2025-10-03,,3.0\n",
        );
        let ds = load_file(tmp.path(), None).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].category(GROUP_COLUMN), Some("A"));
    }

    #[test]
    fn requested_columns_subset_the_table_and_missing_ones_are_omitted() {
        let tmp = csv_file(SAMPLE_CSV);
        let cols = vec![
            "Group".to_string(),
            "Talk duration".to_string(),
            "SMS quantity".to_string(), // not in the source → omitted
        ];
        let ds = load_file(tmp.path(), Some(&cols)).unwrap();
        assert_eq!(ds.column_names, vec!["Group", "Talk duration"]);
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let err = load_file(Path::new("/definitely/not/here.csv"), None).unwrap_err();
        assert!(matches!(err, LoadError::SourceNotFound(_)));
    }

    #[test]
    fn malformed_json_is_schema_parse() {
        let mut tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(tmp, "{{ not json").unwrap();
        let err = load_file(tmp.path(), None).unwrap_err();
        assert!(matches!(err, LoadError::SchemaParse(_)));
    }

    #[test]
    fn unsupported_extension_is_schema_parse() {
        let mut tmp = tempfile::Builder::new().suffix(".xls").tempfile().unwrap();
        write!(tmp, "whatever").unwrap();
        let err = load_file(tmp.path(), None).unwrap_err();
        assert!(matches!(err, LoadError::SchemaParse(_)));
    }

    #[test]
    fn json_records_load_with_date_normalization() {
        let mut tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            tmp,
            r#"[
              {{"Date": "2025-10-01", "Group": "A", "SMS quantity": 4}},
              {{"Date": "2025-10-02", "Group": null, "SMS quantity": 9}}
            ]"#
        )
        .unwrap();
        let ds = load_file(tmp.path(), None).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].cell("SMS quantity").as_f64(), Some(4.0));
    }

    #[test]
    fn unparseable_numeric_text_is_kept_for_downstream_policies() {
        let tmp = csv_file(
            "Date,Group,Talk duration\n\
             2025-10-01,A,n/a\n",
        );
        let ds = load_file(tmp.path(), None).unwrap();
        assert_eq!(
            ds.records[0].cell("Talk duration"),
            &CellValue::Text("n/a".to_string())
        );
    }

    #[test]
    fn cache_memoizes_by_path_and_columns() {
        let tmp = csv_file(SAMPLE_CSV);
        let mut cache = DatasetCache::new();

        let first = cache.load(tmp.path(), None).unwrap();
        let second = cache.load(tmp.path(), None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.hits, 1);

        // Different column set → different cache entry.
        let cols = vec!["Group".to_string()];
        let third = cache.load(tmp.path(), Some(&cols)).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(cache.hits, 1);
    }
}
