use chrono::NaiveDate;
use eframe::egui::Ui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::color::ColorMap;
use crate::data::aggregate::{format_value, ValueKind};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Trend charts (central panel, below the pivot table)
// ---------------------------------------------------------------------------

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

fn day_number(date: NaiveDate) -> f64 {
    (date - epoch()).num_days() as f64
}

fn date_from_day_number(day: f64) -> NaiveDate {
    epoch() + chrono::Duration::days(day.round() as i64)
}

/// Render the chart-dimension selector and one line chart per selection.
pub fn charts_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Trend charts");

    let chartable = state.chartable_columns();
    if chartable.is_empty() {
        ui.label("No categorical dimensions available for charting.");
        return;
    }

    ui.horizontal_wrapped(|ui: &mut Ui| {
        for col in &chartable {
            let mut checked = state.chart_columns.iter().any(|c| c == col);
            if ui.checkbox(&mut checked, col).changed() {
                if checked {
                    state.chart_columns.push(col.clone());
                } else {
                    state.chart_columns.retain(|c| c != col);
                }
            }
        }
    });

    if state.chart_columns.is_empty() {
        ui.label("Select dimensions to display trend charts.");
        return;
    }

    let Some(view) = state.selected_view().cloned() else {
        return;
    };

    for col in state.chart_columns.clone() {
        ui.add_space(8.0);
        ui.strong(format!("{} by {col}", view.name));
        let points = state.series(&col);
        if points.is_empty() {
            ui.label(format!("No data for the {col} chart."));
            continue;
        }
        chart(ui, &col, &points, view.value_kind);
    }
}

fn chart(
    ui: &mut Ui,
    category_col: &str,
    points: &[crate::data::aggregate::SeriesPoint],
    value_kind: ValueKind,
) {
    let mut categories: Vec<String> = points.iter().map(|p| p.category.clone()).collect();
    categories.dedup();
    let color_map = ColorMap::new(categories.iter().cloned());

    Plot::new(format!("chart_{category_col}"))
        .legend(Legend::default())
        .height(240.0)
        .x_axis_formatter(|mark, _range| {
            date_from_day_number(mark.value)
                .format("%d/%b/%y")
                .to_string()
        })
        .label_formatter(move |name, point| {
            let date = date_from_day_number(point.x);
            let value = format_value(point.y, value_kind);
            format!("{name}\n{}: {value}", date.format("%d/%b/%y"))
        })
        .show(ui, |plot_ui| {
            for category in &categories {
                let series: PlotPoints = points
                    .iter()
                    .filter(|p| &p.category == category)
                    .map(|p| [day_number(p.period), p.value])
                    .collect();

                let line = Line::new(series)
                    .name(category)
                    .color(color_map.color_for(category))
                    .width(1.5);
                plot_ui.line(line);
            }
        });
}
