use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use crate::data::aggregate::Period;
use crate::data::filter::{DateRange, DIMENSIONS};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – period, date range, and dimension filters
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Aggregation period ----
            ui.strong("Aggregation period");
            ui.horizontal(|ui: &mut Ui| {
                for period in Period::ALL {
                    if ui.radio(state.period == period, period.name()).clicked() {
                        state.set_period(period);
                    }
                }
            });
            ui.separator();

            // ---- Date range ----
            ui.strong("Date range");
            if let Some(range) = state.date_range {
                let mut start = range.start;
                let mut end = range.end;
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("From");
                    ui.add(DatePickerButton::new(&mut start).id_salt("range_start"));
                });
                ui.horizontal(|ui: &mut Ui| {
                    ui.label("To");
                    ui.add(DatePickerButton::new(&mut end).id_salt("range_end"));
                });
                if start != range.start || end != range.end {
                    state.set_date_range(DateRange::new(start, end));
                }
            }
            ui.separator();

            // ---- Per-dimension filter widgets (collapsible) ----
            for dim in DIMENSIONS {
                let options = state.dimension_options(dim);
                if options.is_empty() {
                    continue;
                }

                let n_selected = state.filters.selection(dim).len();
                let n_total = options.len();
                let header_text = format!("{dim}  ({n_selected}/{n_total})");

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(dim)
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        if ui.small_button("Clear").clicked() {
                            state.clear_filter(dim);
                        }

                        for option in &options {
                            let available = state.filters.is_available(dim, option);
                            let mut checked = state.filters.is_selected(dim, option);
                            let response = ui.add_enabled(
                                available,
                                egui::Checkbox::new(&mut checked, option),
                            );
                            if response.changed() {
                                state.toggle_filter(dim, option);
                            }
                        }
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            if let Some(name) = state
                .source
                .as_ref()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
            {
                ui.label(name);
                ui.separator();
            }
            ui.label(format!(
                "{} records loaded, {} in view",
                ds.len(),
                state.visible_indices.len()
            ));
            ui.separator();

            // ---- Metric view selector ----
            let current = state
                .selected_view()
                .map(|v| v.name.clone())
                .unwrap_or_default();
            egui::ComboBox::from_id_salt("metric_view")
                .selected_text(&current)
                .show_ui(ui, |ui: &mut Ui| {
                    for (idx, view) in state.views.clone().iter().enumerate() {
                        if ui
                            .selectable_label(state.selected_view == idx, &view.name)
                            .clicked()
                        {
                            state.selected_view = idx;
                        }
                    }
                });
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open call-center raw data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        // Load failures are surfaced as a status message, never a crash.
        state.open_source(&path);
    }
}
