use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::data::aggregate::{
    self, metric_views, MetricView, Period, PivotTable, SeriesPoint,
};
use crate::data::filter::{all_options, filtered_indices, DateRange, FilterModel, DIMENSIONS};
use crate::data::loader::DatasetCache;
use crate::data::model::{CallDataset, GROUP_COLUMN};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The session context, independent of rendering.
///
/// Created fresh when a source dataset is selected and discarded when a
/// different source is opened. Every user interaction mutates this state and
/// then runs one full synchronous pass (availability cascade → row filter);
/// pivot tables and chart series are derived on demand at render time.
pub struct AppState {
    /// Path of the currently opened source file.
    pub source: Option<PathBuf>,

    /// Parsed-dataset memo keyed by (source, requested columns).
    pub cache: DatasetCache,

    /// Loaded dataset (None until the user opens a file). Shared read-only
    /// with the cache; never mutated by filtering or aggregation.
    pub dataset: Option<Arc<CallDataset>>,

    /// Per-dimension filter selections and availability.
    pub filters: FilterModel,

    /// Active inclusive date bound (None while no dataset is loaded).
    pub date_range: Option<DateRange>,

    /// Active time-bucketing granularity.
    pub period: Period,

    /// Metric views offered for the loaded dataset.
    pub views: Vec<MetricView>,

    /// Index into `views` of the displayed metric.
    pub selected_view: usize,

    /// Dimensions charted below the pivot table.
    pub chart_columns: Vec<String>,

    /// Indices of records passing the current filters (cached per pass).
    pub visible_indices: Vec<usize>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            source: None,
            cache: DatasetCache::new(),
            dataset: None,
            filters: FilterModel::new(),
            date_range: None,
            period: Period::Daily,
            views: Vec::new(),
            selected_view: 0,
            chart_columns: Vec::new(),
            visible_indices: Vec::new(),
            status_message: None,
        }
    }
}

impl AppState {
    /// Open a source file, replacing the whole session.
    ///
    /// Loader failures are recovered here: the session becomes an empty
    /// dataset with the error surfaced as a status message, never a fault.
    pub fn open_source(&mut self, path: &Path) {
        match self.cache.load(path, None) {
            Ok(dataset) => {
                self.source = Some(path.to_path_buf());
                self.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.source = Some(path.to_path_buf());
                self.set_dataset(Arc::new(CallDataset::default()));
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Ingest a dataset and reset all session-scoped selections.
    pub fn set_dataset(&mut self, dataset: Arc<CallDataset>) {
        self.filters = FilterModel::new();
        self.date_range = DateRange::default_window(&dataset);
        self.views = metric_views(&dataset);
        self.selected_view = 0;
        self.chart_columns = ["Channel type", "Classification"]
            .iter()
            .filter(|col| dataset.column_names.iter().any(|c| c == *col))
            .map(|col| col.to_string())
            .collect();
        self.status_message = None;
        self.dataset = Some(dataset);
        self.refresh();
    }

    /// Run one full pass: availability cascade, then row filtering.
    pub fn refresh(&mut self) {
        let Some(dataset) = &self.dataset else {
            self.visible_indices.clear();
            return;
        };
        let Some(range) = self.date_range else {
            self.visible_indices.clear();
            return;
        };
        self.filters.recompute_availability(dataset, range);
        self.visible_indices = filtered_indices(dataset, range, &self.filters);
    }

    /// Flip one value in one dimension's selection, then re-run the pass.
    pub fn toggle_filter(&mut self, dimension: &str, value: &str) {
        self.filters.toggle(dimension, value);
        self.refresh();
    }

    /// Reset one dimension to "no restriction", then re-run the pass.
    pub fn clear_filter(&mut self, dimension: &str) {
        self.filters.clear(dimension);
        self.refresh();
    }

    pub fn set_period(&mut self, period: Period) {
        self.period = period;
        self.refresh();
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.date_range = Some(range);
        self.refresh();
    }

    /// The metric view currently displayed.
    pub fn selected_view(&self) -> Option<&MetricView> {
        self.views.get(self.selected_view)
    }

    /// Dimensions offered for charting (all filter dimensions present in the
    /// dataset except the pivot row key).
    pub fn chartable_columns(&self) -> Vec<String> {
        let Some(dataset) = &self.dataset else {
            return Vec::new();
        };
        DIMENSIONS
            .iter()
            .filter(|dim| **dim != GROUP_COLUMN)
            .filter(|dim| dataset.column_names.iter().any(|c| c == *dim))
            .map(|dim| dim.to_string())
            .collect()
    }

    /// All options of a dimension across the unfiltered dataset.
    pub fn dimension_options(&self, dimension: &str) -> Vec<String> {
        self.dataset
            .as_ref()
            .map(|ds| all_options(ds, dimension))
            .unwrap_or_default()
    }

    /// Derive the pivot table for the current selections.
    pub fn pivot(&self) -> PivotTable {
        let (Some(dataset), Some(view)) = (&self.dataset, self.selected_view()) else {
            return PivotTable::default();
        };
        aggregate::aggregate(
            dataset,
            &self.visible_indices,
            GROUP_COLUMN,
            &view.kind,
            self.period,
        )
    }

    /// Derive the chart series for one category column.
    pub fn series(&self, category_col: &str) -> Vec<SeriesPoint> {
        let (Some(dataset), Some(view)) = (&self.dataset, self.selected_view()) else {
            return Vec::new();
        };
        aggregate::build_series(
            dataset,
            &self.visible_indices,
            category_col,
            &view.kind,
            self.period,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use super::*;
    use crate::data::model::{CellValue, Record};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dataset() -> Arc<CallDataset> {
        let rec = |date: &str, group: &str, channel: &str, value: f64| {
            let mut cells = BTreeMap::new();
            cells.insert(GROUP_COLUMN.to_string(), CellValue::Text(group.into()));
            cells.insert("Channel type".to_string(), CellValue::Text(channel.into()));
            cells.insert("Talk duration".to_string(), CellValue::Number(value));
            Record {
                date: d(date),
                cells,
            }
        };
        Arc::new(CallDataset::from_records(vec![
            rec("2025-10-01", "A", "Inhouse", 10.0),
            rec("2025-10-02", "A", "Vendor", 20.0),
            rec("2025-10-02", "B", "Inhouse", 5.0),
        ]))
    }

    #[test]
    fn set_dataset_resets_the_session() {
        let mut state = AppState::default();
        state.set_dataset(dataset());
        state.toggle_filter("Group", "A");
        assert_eq!(state.visible_indices, vec![0, 1]);

        // A new dataset discards the previous session's selections.
        state.set_dataset(dataset());
        assert!(state.filters.selection("Group").is_empty());
        assert_eq!(state.visible_indices.len(), 3);
    }

    #[test]
    fn default_window_clips_to_data() {
        let mut state = AppState::default();
        state.set_dataset(dataset());
        let range = state.date_range.unwrap();
        assert_eq!(range.start, d("2025-10-01"));
        assert_eq!(range.end, d("2025-10-02"));
    }

    #[test]
    fn toggle_runs_a_full_pass() {
        let mut state = AppState::default();
        state.set_dataset(dataset());
        state.toggle_filter("Group", "B");
        assert_eq!(state.visible_indices, vec![2]);
        // Availability of a later dimension followed the cascade.
        assert!(!state.filters.is_available("Channel type", "Vendor"));
        state.clear_filter("Group");
        assert_eq!(state.visible_indices.len(), 3);
    }

    #[test]
    fn pivot_and_series_derive_from_current_state() {
        let mut state = AppState::default();
        state.set_dataset(dataset());
        let view_idx = state
            .views
            .iter()
            .position(|v| v.name == "Avg Talk duration")
            .unwrap();
        state.selected_view = view_idx;

        let pivot = state.pivot();
        assert_eq!(pivot.row_keys, vec!["A", "B"]);
        assert_eq!(pivot.value("A", d("2025-10-01")), Some(10.0));

        let series = state.series("Channel type");
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn load_failure_is_recovered_into_an_empty_session() {
        let mut state = AppState::default();
        state.open_source(Path::new("/missing/rawdata.csv"));
        assert!(state.dataset.as_ref().unwrap().is_empty());
        assert!(state.status_message.as_ref().unwrap().contains("not found"));
        assert!(state.pivot().is_empty());
    }
}
