use eframe::egui::{self, RichText, ScrollArea, Ui};

use crate::data::aggregate::format_value;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Pivot table (group rows × period columns)
// ---------------------------------------------------------------------------

/// Render the aggregated pivot table for the current metric view.
pub fn pivot_table(ui: &mut Ui, state: &AppState) {
    let Some(view) = state.selected_view() else {
        ui.label("No metric available for this dataset.");
        return;
    };
    let pivot = state.pivot();

    ui.heading(format!("{} by Group ({})", view.name, state.period.name()));

    if pivot.is_empty() {
        ui.label("No data matches the selected filters.");
        return;
    }

    let value_kind = view.value_kind;
    ScrollArea::horizontal()
        .id_salt("pivot_scroll")
        .show(ui, |ui: &mut Ui| {
            egui::Grid::new("pivot_grid")
                .striped(true)
                .min_col_width(64.0)
                .show(ui, |ui: &mut Ui| {
                    // Header row: period labels in chronological order.
                    ui.strong("Group");
                    for label in &pivot.column_labels {
                        ui.strong(label);
                    }
                    ui.end_row();

                    for row in &pivot.row_keys {
                        ui.label(RichText::new(row).strong());
                        for &period in &pivot.periods {
                            match pivot.value(row, period) {
                                Some(v) => {
                                    ui.label(format_value(v, value_kind));
                                }
                                None => {
                                    // Sparse combination: blank, not zero.
                                    ui.label("");
                                }
                            }
                        }
                        ui.end_row();
                    }
                });
        });
}
