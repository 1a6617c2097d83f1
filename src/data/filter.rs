use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::model::{CallDataset, CellValue};

/// Filterable dimensions in their fixed evaluation order. The order matters:
/// availability cascades left to right (§ see `recompute_availability`).
pub const DIMENSIONS: [&str; 6] = [
    "Group",
    "Team leader",
    "Supervisor",
    "Work mode",
    "Classification",
    "Channel type",
];

// ---------------------------------------------------------------------------
// DateRange – inclusive [start, end] bound over the record date
// ---------------------------------------------------------------------------

/// Default reporting window applied when a dataset is first opened,
/// before clipping to the data's actual span.
pub const DEFAULT_WINDOW_START: (i32, u32, u32) = (2025, 10, 1);
pub const DEFAULT_WINDOW_END: (i32, u32, u32) = (2025, 10, 31);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The default window clipped to the dataset's actual span.
    ///
    /// Clipping rules:
    /// * default start before the data → data minimum
    /// * default end after the data → data maximum
    /// * default start after all data → data minimum (whole range)
    /// * default end before all data → data maximum (whole range)
    ///
    /// Returns `None` for an empty dataset (no dates to bound).
    pub fn default_window(dataset: &CallDataset) -> Option<Self> {
        let min = dataset.date_min?;
        let max = dataset.date_max?;

        let (sy, sm, sd) = DEFAULT_WINDOW_START;
        let (ey, em, ed) = DEFAULT_WINDOW_END;
        let mut start = NaiveDate::from_ymd_opt(sy, sm, sd).unwrap_or(min);
        let mut end = NaiveDate::from_ymd_opt(ey, em, ed).unwrap_or(max);

        if start < min {
            start = min;
        }
        if end > max {
            end = max;
        }
        if start > max {
            start = min;
        }
        if end < min {
            end = max;
        }
        Some(DateRange { start, end })
    }
}

// ---------------------------------------------------------------------------
// FilterModel – per-dimension inclusion sets with availability cascade
// ---------------------------------------------------------------------------

/// Per-dimension selection state.
///
/// A selection is an ordered-insertion list of included values; an empty
/// selection means "no restriction". Availability is recomputed by a single
/// left-to-right pass over [`DIMENSIONS`]: filters on earlier dimensions
/// constrain the options of later ones, never the reverse. This is a
/// deliberate directional simplification, not a fixed-point solver.
#[derive(Debug, Clone, Default)]
pub struct FilterModel {
    /// dimension → explicitly included values, in click order.
    selections: BTreeMap<String, Vec<String>>,
    /// dimension → values still reachable under earlier filters + date range.
    available: BTreeMap<String, BTreeSet<String>>,
}

impl FilterModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently included values for a dimension (empty = no restriction).
    pub fn selection(&self, dimension: &str) -> &[String] {
        self.selections
            .get(dimension)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_selected(&self, dimension: &str, value: &str) -> bool {
        self.selection(dimension).iter().any(|v| v == value)
    }

    pub fn is_available(&self, dimension: &str, value: &str) -> bool {
        self.available
            .get(dimension)
            .is_some_and(|set| set.contains(value))
    }

    /// Flip a value's membership in a dimension's selection.
    ///
    /// Toggling a value that is not currently available is a no-op: the UI
    /// disables such options, and state restored from elsewhere must not
    /// resurrect them either.
    pub fn toggle(&mut self, dimension: &str, value: &str) {
        if !self.is_available(dimension, value) {
            return;
        }
        let selected = self.selections.entry(dimension.to_string()).or_default();
        if let Some(pos) = selected.iter().position(|v| v == value) {
            selected.remove(pos);
        } else {
            selected.push(value.to_string());
        }
    }

    /// Drop every selection in a dimension (back to "no restriction").
    pub fn clear(&mut self, dimension: &str) {
        self.selections.remove(dimension);
    }

    /// Recompute per-dimension availability and prune stale selections.
    ///
    /// Single pass over [`DIMENSIONS`] in order. For each dimension *d*:
    /// 1. available(d) = distinct values of *d* among rows inside the date
    ///    range that pass the selections of dimensions strictly before *d*;
    /// 2. selection(d) is pruned to available(d);
    /// 3. the running row set is narrowed by the pruned selection(d).
    pub fn recompute_availability(&mut self, dataset: &CallDataset, range: DateRange) {
        let mut running: Vec<&super::model::Record> = dataset
            .records
            .iter()
            .filter(|rec| range.contains(rec.date))
            .collect();

        for dim in DIMENSIONS {
            let options: BTreeSet<String> = running
                .iter()
                .filter_map(|rec| rec.category(dim))
                .map(str::to_string)
                .collect();

            if let Some(selected) = self.selections.get_mut(dim) {
                selected.retain(|v| options.contains(v));
                if !selected.is_empty() {
                    let keep: BTreeSet<&str> = selected.iter().map(String::as_str).collect();
                    running.retain(|rec| {
                        rec.category(dim).is_some_and(|v| keep.contains(v))
                    });
                }
            }
            self.available.insert(dim.to_string(), options);
        }
    }
}

/// All distinct values a dimension takes across the *unfiltered* dataset,
/// sorted. The UI lists these and greys out the unavailable ones.
pub fn all_options(dataset: &CallDataset, dimension: &str) -> Vec<String> {
    dataset
        .unique_values
        .get(dimension)
        .map(|vals| {
            vals.iter()
                .filter_map(|v| match v {
                    CellValue::Text(s) => Some(s.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Filter application
// ---------------------------------------------------------------------------

/// Return indices of records that pass the date range and all active filters.
///
/// Filters compose as logical AND across dimensions; an empty selection
/// places no constraint. The dataset is never mutated; an empty result is a
/// normal outcome, not an error.
pub fn filtered_indices(
    dataset: &CallDataset,
    range: DateRange,
    filters: &FilterModel,
) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            if !range.contains(rec.date) {
                return false;
            }
            for dim in DIMENSIONS {
                let selected = filters.selection(dim);
                if selected.is_empty() {
                    continue;
                }
                match rec.category(dim) {
                    Some(val) => {
                        if !selected.iter().any(|s| s == val) {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
            true
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::Record;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rec(date: &str, pairs: &[(&str, &str)]) -> Record {
        let cells: BTreeMap<String, CellValue> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), CellValue::Text(v.to_string())))
            .collect();
        Record {
            date: d(date),
            cells,
        }
    }

    fn sample() -> CallDataset {
        CallDataset::from_records(vec![
            rec(
                "2025-10-01",
                &[("Group", "A"), ("Team leader", "Tina"), ("Work mode", "Onsite")],
            ),
            rec(
                "2025-10-02",
                &[("Group", "A"), ("Team leader", "Tom"), ("Work mode", "WFH")],
            ),
            rec(
                "2025-10-03",
                &[("Group", "B"), ("Team leader", "Bea"), ("Work mode", "Onsite")],
            ),
            rec(
                "2025-11-15",
                &[("Group", "C"), ("Team leader", "Carl"), ("Work mode", "WFH")],
            ),
        ])
    }

    fn full_range(ds: &CallDataset) -> DateRange {
        DateRange::new(ds.date_min.unwrap(), ds.date_max.unwrap())
    }

    #[test]
    fn availability_cascades_left_to_right() {
        let ds = sample();
        let range = full_range(&ds);
        let mut fm = FilterModel::new();
        fm.recompute_availability(&ds, range);

        // Selecting Group=A narrows later dimensions…
        fm.toggle("Group", "A");
        fm.recompute_availability(&ds, range);
        assert!(fm.is_available("Team leader", "Tina"));
        assert!(fm.is_available("Team leader", "Tom"));
        assert!(!fm.is_available("Team leader", "Bea"));

        // …but a later selection never narrows an earlier dimension.
        fm.toggle("Team leader", "Tina");
        fm.recompute_availability(&ds, range);
        assert!(fm.is_available("Group", "A"));
        assert!(fm.is_available("Group", "B"));
        assert!(fm.is_available("Group", "C"));
    }

    #[test]
    fn selections_are_pruned_when_availability_shrinks() {
        let ds = sample();
        let range = full_range(&ds);
        let mut fm = FilterModel::new();
        fm.recompute_availability(&ds, range);

        fm.toggle("Team leader", "Bea");
        fm.recompute_availability(&ds, range);
        assert!(fm.is_selected("Team leader", "Bea"));

        // Group=A excludes every row with leader Bea → selection pruned.
        fm.toggle("Group", "A");
        fm.recompute_availability(&ds, range);
        assert!(!fm.is_selected("Team leader", "Bea"));
    }

    #[test]
    fn prune_is_idempotent() {
        let ds = sample();
        let range = full_range(&ds);
        let mut fm = FilterModel::new();
        fm.recompute_availability(&ds, range);
        fm.toggle("Group", "A");
        fm.toggle("Team leader", "Tina");
        fm.toggle("Team leader", "Tom");

        fm.recompute_availability(&ds, range);
        let once: Vec<String> = fm.selection("Team leader").to_vec();
        fm.recompute_availability(&ds, range);
        let twice: Vec<String> = fm.selection("Team leader").to_vec();
        assert_eq!(once, twice);
    }

    #[test]
    fn toggling_unavailable_value_is_a_noop() {
        let ds = sample();
        let range = full_range(&ds);
        let mut fm = FilterModel::new();
        fm.recompute_availability(&ds, range);
        fm.toggle("Group", "A");
        fm.recompute_availability(&ds, range);

        assert!(!fm.is_available("Team leader", "Bea"));
        fm.toggle("Team leader", "Bea");
        assert!(fm.selection("Team leader").is_empty());
    }

    #[test]
    fn toggle_flips_membership_and_keeps_click_order() {
        let ds = sample();
        let range = full_range(&ds);
        let mut fm = FilterModel::new();
        fm.recompute_availability(&ds, range);

        fm.toggle("Group", "B");
        fm.toggle("Group", "A");
        assert_eq!(fm.selection("Group"), ["B".to_string(), "A".to_string()]);
        fm.toggle("Group", "B");
        assert_eq!(fm.selection("Group"), ["A".to_string()]);
    }

    #[test]
    fn filters_compose_as_order_independent_and() {
        let ds = sample();
        let range = full_range(&ds);

        let mut ab = FilterModel::new();
        ab.recompute_availability(&ds, range);
        ab.toggle("Group", "A");
        ab.toggle("Work mode", "Onsite");

        let mut ba = FilterModel::new();
        ba.recompute_availability(&ds, range);
        ba.toggle("Work mode", "Onsite");
        ba.toggle("Group", "A");

        assert_eq!(
            filtered_indices(&ds, range, &ab),
            filtered_indices(&ds, range, &ba)
        );
        assert_eq!(filtered_indices(&ds, range, &ab), vec![0]);
    }

    #[test]
    fn empty_selection_means_no_restriction() {
        let ds = sample();
        let range = full_range(&ds);
        let fm = FilterModel::new();
        assert_eq!(filtered_indices(&ds, range, &fm).len(), ds.len());
    }

    #[test]
    fn date_range_bound_is_inclusive() {
        let ds = sample();
        let fm = FilterModel::new();
        let range = DateRange::new(d("2025-10-02"), d("2025-10-03"));
        assert_eq!(filtered_indices(&ds, range, &fm), vec![1, 2]);
    }

    #[test]
    fn default_window_clips_to_dataset_span() {
        // Data covers the default window partially → clipped on both sides.
        let ds = sample(); // 2025-10-01 ..= 2025-11-15
        let range = DateRange::default_window(&ds).unwrap();
        assert_eq!(range.start, d("2025-10-01"));
        assert_eq!(range.end, d("2025-10-31"));
    }

    #[test]
    fn default_window_outside_data_substitutes_full_range() {
        let ds = CallDataset::from_records(vec![
            rec("2024-03-10", &[("Group", "A")]),
            rec("2024-03-20", &[("Group", "B")]),
        ]);
        let range = DateRange::default_window(&ds).unwrap();
        assert_eq!(range.start, d("2024-03-10"));
        assert_eq!(range.end, d("2024-03-20"));
    }

    #[test]
    fn default_window_of_empty_dataset_is_none() {
        let ds = CallDataset::from_records(Vec::new());
        assert!(DateRange::default_window(&ds).is_none());
    }
}
