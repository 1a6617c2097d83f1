use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;

/// Column holding the primary grouping dimension. Records without it are
/// dropped at load time, so downstream code can rely on it being present.
pub const GROUP_COLUMN: &str = "Group";

/// Column holding the record date in the raw source.
pub const DATE_COLUMN: &str = "Date";

// ---------------------------------------------------------------------------
// CellValue – a single cell in the raw table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring the source table's dtypes.
/// Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Number(_) => 1,
                Text(_) => 2,
                Date(_) => 3,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Number(f) => f.to_bits().hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Lenient numeric coercion: numbers pass through, text is parsed.
    /// Returns `None` when the value cannot be read as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the raw table
// ---------------------------------------------------------------------------

/// A single operational record (one row of the source table).
#[derive(Debug, Clone)]
pub struct Record {
    /// Record date, already normalized. Rows without one never reach here.
    pub date: NaiveDate,
    /// Remaining columns: column_name → value.
    pub cells: BTreeMap<String, CellValue>,
}

impl Record {
    /// Value of a column, `Null` when the column is absent from this row.
    pub fn cell(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&CellValue::Null)
    }

    /// Categorical value of a column as text, `None` for non-text cells.
    pub fn category(&self, column: &str) -> Option<&str> {
        match self.cells.get(column) {
            Some(CellValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CallDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset with pre-computed column indices.
#[derive(Debug, Clone, Default)]
pub struct CallDataset {
    /// All records (rows).
    pub records: Vec<Record>,
    /// Ordered list of column names (excludes the date column).
    pub column_names: Vec<String>,
    /// For each column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
    /// Earliest record date, `None` for an empty dataset.
    pub date_min: Option<NaiveDate>,
    /// Latest record date, `None` for an empty dataset.
    pub date_max: Option<NaiveDate>,
}

impl CallDataset {
    /// Build column indices and the date span from the loaded records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut column_names_set: BTreeSet<String> = BTreeSet::new();
        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = BTreeMap::new();
        let mut date_min: Option<NaiveDate> = None;
        let mut date_max: Option<NaiveDate> = None;

        for rec in &records {
            for (col, val) in &rec.cells {
                column_names_set.insert(col.clone());
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
            date_min = Some(date_min.map_or(rec.date, |d| d.min(rec.date)));
            date_max = Some(date_max.map_or(rec.date, |d| d.max(rec.date)));
        }
        let column_names: Vec<String> = column_names_set.into_iter().collect();
        CallDataset {
            records,
            column_names,
            unique_values,
            date_min,
            date_max,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Columns that hold at least one numeric value (metric candidates).
    pub fn numeric_columns(&self) -> Vec<String> {
        self.column_names
            .iter()
            .filter(|col| {
                self.unique_values
                    .get(*col)
                    .is_some_and(|vals| vals.iter().any(|v| matches!(v, CellValue::Number(_))))
            })
            .cloned()
            .collect()
    }
}
