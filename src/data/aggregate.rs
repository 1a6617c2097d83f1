use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use super::model::CallDataset;

// ---------------------------------------------------------------------------
// Period – time bucketing granularity
// ---------------------------------------------------------------------------

/// Time-bucketing granularity selected by the user.
///
/// Weekly buckets follow ISO 8601: the bucket instant is the Monday of the
/// ISO week and the label carries the ISO week number and ISO week-year.
/// The same convention is used by the pivot engines and the series builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Daily,
    Weekly,
    Monthly,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Daily, Period::Weekly, Period::Monthly];

    /// UI name of the granularity.
    pub fn name(self) -> &'static str {
        match self {
            Period::Daily => "Daily",
            Period::Weekly => "Weekly",
            Period::Monthly => "Monthly",
        }
    }

    /// Map a date to the start instant of its bucket.
    pub fn bucket(self, date: NaiveDate) -> NaiveDate {
        match self {
            Period::Daily => date,
            Period::Weekly => {
                let back = date.weekday().num_days_from_monday() as i64;
                date - chrono::Duration::days(back)
            }
            Period::Monthly => {
                NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
            }
        }
    }

    /// Display label for a bucket start produced by [`Period::bucket`].
    pub fn bucket_label(self, bucket: NaiveDate) -> String {
        match self {
            Period::Daily => bucket.format("%d/%b/%y").to_string(),
            Period::Weekly => {
                let iso = bucket.iso_week();
                format!("W{}-{:02}", iso.week(), iso.year() % 100)
            }
            Period::Monthly => bucket.format("%b-%y").to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Metric descriptions
// ---------------------------------------------------------------------------

/// How a metric is aggregated per (group, bucket).
///
/// The two kinds carry deliberately different coercion policies:
/// mean drops rows whose value does not parse, ratio fills them with 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricKind {
    /// Arithmetic mean of one column.
    Mean { value: String },
    /// `sum(numerator) / sum(denominator)`, 0 when the denominator sum is 0.
    Ratio {
        numerator: String,
        denominator: String,
    },
}

/// How aggregated values are displayed on axes, tooltips and table cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Plain,
    Percent,
}

/// Format a metric value for table cells and tooltips.
pub fn format_value(value: f64, kind: ValueKind) -> String {
    match kind {
        ValueKind::Plain => format!("{value:.2}"),
        ValueKind::Percent => format!("{:.2}%", value * 100.0),
    }
}

/// A named dashboard view: a metric plus its display kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricView {
    pub name: String,
    pub kind: MetricKind,
    pub value_kind: ValueKind,
}

/// Ratio views offered when both of their columns exist in the source.
const RATIO_VIEWS: [(&str, &str, &str); 2] = [
    ("Performance rate", "Collected principal", "Collected assigned"),
    ("Connect rate", "Dialing connected", "Dialing quantity"),
];

/// Build the metric view catalog for a dataset: one mean view per numeric
/// column plus the known ratio views whose columns are present.
pub fn metric_views(dataset: &CallDataset) -> Vec<MetricView> {
    let numeric = dataset.numeric_columns();
    let mut views: Vec<MetricView> = numeric
        .iter()
        .map(|col| MetricView {
            name: format!("Avg {col}"),
            kind: MetricKind::Mean { value: col.clone() },
            value_kind: ValueKind::Plain,
        })
        .collect();

    for (name, num, den) in RATIO_VIEWS {
        if numeric.iter().any(|c| c == num) && numeric.iter().any(|c| c == den) {
            views.push(MetricView {
                name: name.to_string(),
                kind: MetricKind::Ratio {
                    numerator: num.to_string(),
                    denominator: den.to_string(),
                },
                value_kind: ValueKind::Percent,
            });
        }
    }
    views
}

// ---------------------------------------------------------------------------
// PivotTable – group rows × period columns
// ---------------------------------------------------------------------------

/// Aggregated metric reshaped as group rows × chronological period columns.
/// Missing (group, period) combinations stay missing, they are not 0-filled.
#[derive(Debug, Clone, Default)]
pub struct PivotTable {
    /// Row keys, lexicographically ordered.
    pub row_keys: Vec<String>,
    /// Bucket start instants, chronologically ordered.
    pub periods: Vec<NaiveDate>,
    /// Display label per entry of `periods`.
    pub column_labels: Vec<String>,
    cells: BTreeMap<(String, NaiveDate), f64>,
}

impl PivotTable {
    fn from_cells(cells: BTreeMap<(String, NaiveDate), f64>, period: Period) -> Self {
        let mut row_keys: Vec<String> = cells.keys().map(|(g, _)| g.clone()).collect();
        row_keys.dedup();
        let mut periods: Vec<NaiveDate> = cells.keys().map(|(_, p)| *p).collect();
        periods.sort();
        periods.dedup();
        let column_labels = periods.iter().map(|p| period.bucket_label(*p)).collect();
        PivotTable {
            row_keys,
            periods,
            column_labels,
            cells,
        }
    }

    /// Aggregated value for a (row, period) cell, `None` when absent.
    pub fn value(&self, row: &str, period: NaiveDate) -> Option<f64> {
        self.cells.get(&(row.to_string(), period)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Aggregation engines
// ---------------------------------------------------------------------------

/// Mean-based pivot: bucket the selected rows by period, average
/// `value_col` per (group, bucket).
///
/// Rows whose value fails numeric coercion are silently dropped, as are rows
/// without a categorical value in `group_col`. An empty selection yields an
/// empty pivot, not an error.
pub fn aggregate_mean(
    dataset: &CallDataset,
    indices: &[usize],
    group_col: &str,
    value_col: &str,
    period: Period,
) -> PivotTable {
    let mut sums: BTreeMap<(String, NaiveDate), (f64, usize)> = BTreeMap::new();

    for &idx in indices {
        let rec = &dataset.records[idx];
        let Some(group) = rec.category(group_col) else {
            continue;
        };
        let Some(value) = rec.cell(value_col).as_f64() else {
            continue; // drop-on-failure policy for mean metrics
        };
        let bucket = period.bucket(rec.date);
        let entry = sums.entry((group.to_string(), bucket)).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let cells = sums
        .into_iter()
        .map(|(key, (sum, n))| (key, sum / n as f64))
        .collect();
    PivotTable::from_cells(cells, period)
}

/// Ratio pivot: per (group, bucket) compute `sum(num) / sum(den)`.
///
/// Coercion failures contribute 0 to either sum (fill-with-0 policy, the row
/// still participates). A zero denominator sum yields exactly 0, never NaN.
pub fn aggregate_ratio(
    dataset: &CallDataset,
    indices: &[usize],
    group_col: &str,
    numerator_col: &str,
    denominator_col: &str,
    period: Period,
) -> PivotTable {
    let mut sums: BTreeMap<(String, NaiveDate), (f64, f64)> = BTreeMap::new();

    for &idx in indices {
        let rec = &dataset.records[idx];
        let Some(group) = rec.category(group_col) else {
            continue;
        };
        let num = rec.cell(numerator_col).as_f64().unwrap_or(0.0);
        let den = rec.cell(denominator_col).as_f64().unwrap_or(0.0);
        let bucket = period.bucket(rec.date);
        let entry = sums.entry((group.to_string(), bucket)).or_insert((0.0, 0.0));
        entry.0 += num;
        entry.1 += den;
    }

    let cells = sums
        .into_iter()
        .map(|(key, (num, den))| {
            let ratio = if den == 0.0 { 0.0 } else { num / den };
            (key, ratio)
        })
        .collect();
    PivotTable::from_cells(cells, period)
}

/// Dispatch on the metric kind with the matching coercion policy.
pub fn aggregate(
    dataset: &CallDataset,
    indices: &[usize],
    group_col: &str,
    metric: &MetricKind,
    period: Period,
) -> PivotTable {
    match metric {
        MetricKind::Mean { value } => aggregate_mean(dataset, indices, group_col, value, period),
        MetricKind::Ratio {
            numerator,
            denominator,
        } => aggregate_ratio(dataset, indices, group_col, numerator, denominator, period),
    }
}

// ---------------------------------------------------------------------------
// Chart series
// ---------------------------------------------------------------------------

/// One plotted point: a category's aggregated value at a bucket start.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub category: String,
    pub period: NaiveDate,
    pub value: f64,
}

/// Flatten the aggregate into line-chart series: one point per populated
/// (category, bucket) pair, ordered by bucket ascending within a category.
/// Absent combinations are skipped, never padded with zeros.
pub fn build_series(
    dataset: &CallDataset,
    indices: &[usize],
    category_col: &str,
    metric: &MetricKind,
    period: Period,
) -> Vec<SeriesPoint> {
    let pivot = aggregate(dataset, indices, category_col, metric, period);
    let mut points = Vec::new();
    for category in &pivot.row_keys {
        for &bucket in &pivot.periods {
            if let Some(value) = pivot.value(category, bucket) {
                points.push(SeriesPoint {
                    category: category.clone(),
                    period: bucket,
                    value,
                });
            }
        }
    }
    points
}
