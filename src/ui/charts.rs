use std::f32::consts::TAU;

use eframe::egui::{
    self, Align2, Color32, FontId, Pos2, RichText, ScrollArea, Sense, Shape, Stroke, Ui,
};
use egui_extras::{Column as TableColumn, TableBuilder};
use egui_plot::{Bar, BarChart, Plot};

use crate::color::{generate_palette, red_yellow_green};
use crate::data::metrics::Aggregate;
use crate::data::model::FilteredView;
use crate::data::present::{
    export_columns, format_usd, row_values, CountryTile, DonutSlice, HistogramBar, MetricCard,
    RankedBars,
};
use crate::state::AppState;
use crate::ui::panels::save_file_dialog;

const CHART_HEIGHT: f32 = 300.0;
const BAR_COLOR: Color32 = Color32::from_rgb(0x63, 0x6e, 0xfa);

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render metrics, charts and the raw table for the current selection.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    if let Some(err) = state.load_error.clone() {
        ui.vertical_centered(|ui: &mut Ui| {
            ui.add_space(40.0);
            ui.heading(RichText::new(err).color(Color32::RED));
            ui.add_space(8.0);
            if ui.button("Tentar novamente").clicked() {
                state.reload();
            }
        });
        return;
    }

    let Some(panels) = state.panels.clone() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Abra um arquivo para começar  (Arquivo → Abrir…)");
        });
        return;
    };

    let mut download_clicked = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("🎲 Dashboard de Análise de Salários na Área de Dados");
            ui.label(
                "Explore os dados salariais na área de dados nos últimos anos. \
                 Utilize os filtros à esquerda para refinar sua análise.",
            );
            ui.label(
                RichText::new(
                    "Dica: use os presets para filtrar rapidamente. Use a busca por cargo \
                     para encontrar termos parciais como 'data', 'engenheiro', 'analista'.",
                )
                .color(Color32::LIGHT_BLUE),
            );
            ui.separator();

            ui.strong("Métricas gerais (Salário anual em USD)");
            if state.visible_indices.is_empty() {
                ui.colored_label(
                    Color32::YELLOW,
                    "Nenhum registro corresponde aos filtros atuais.",
                );
            }
            metric_row(ui, &panels.cards);
            ui.separator();

            ui.strong("Gráficos");
            ui.columns(2, |cols: &mut [Ui]| {
                chart_or_notice(&mut cols[0], "Top cargos por salário médio", &panels.ranking, ranked_bar_chart);
                chart_or_notice(&mut cols[1], "Distribuição de salários anuais", &panels.histogram, |ui, bars| {
                    histogram_chart(ui, bars)
                });
            });
            ui.columns(2, |cols: &mut [Ui]| {
                chart_or_notice(&mut cols[0], "Proporção dos tipos de trabalho", &panels.work_modes, |ui, slices| {
                    donut_chart(ui, slices)
                });
                let title = format!("Salário médio de '{}' por país", state.config.focus_title);
                chart_or_notice(&mut cols[1], &title, &panels.countries, |ui, tiles| {
                    country_tile_map(ui, tiles)
                });
            });
            ui.separator();

            ui.strong("Dados Detalhados");
            if ui.button("📥 Baixar dados filtrados (CSV)").clicked() {
                download_clicked = true;
            }
            if let Some(view) = state.view() {
                ui.push_id("raw_table", |ui: &mut Ui| raw_table(ui, &view));
            }
        });

    if download_clicked {
        save_file_dialog(state);
    }
}

/// Draw `chart` when the aggregate is ready, otherwise a warning with the
/// reason.
fn chart_or_notice<T>(ui: &mut Ui, title: &str, agg: &Aggregate<T>, chart: impl FnOnce(&mut Ui, &T)) {
    ui.label(RichText::new(title).strong());
    match agg {
        Aggregate::Ready(value) => chart(ui, value),
        Aggregate::Unavailable(reason) => {
            ui.colored_label(Color32::YELLOW, format!("Nenhum dado para exibir. {reason}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Metric cards
// ---------------------------------------------------------------------------

fn metric_row(ui: &mut Ui, cards: &[MetricCard]) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for card in cards {
            egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
                ui.set_min_width(180.0);
                ui.vertical(|ui: &mut Ui| {
                    ui.label(card.label);
                    ui.label(RichText::new(&card.value).size(22.0).strong());
                    if let Some(delta) = &card.delta {
                        let color = if delta.starts_with('-') {
                            Color32::LIGHT_RED
                        } else {
                            Color32::LIGHT_GREEN
                        };
                        ui.label(RichText::new(delta).color(color));
                    }
                });
            });
        }
    });
}

// ---------------------------------------------------------------------------
// Plots
// ---------------------------------------------------------------------------

/// Horizontal bars; the y axis shows the group labels.
fn ranked_bar_chart(ui: &mut Ui, ranked: &RankedBars) {
    let bars: Vec<Bar> = ranked
        .values
        .iter()
        .zip(&ranked.labels)
        .enumerate()
        .map(|(i, (&v, label))| Bar::new(i as f64, v).width(0.7).name(label))
        .collect();
    let chart = BarChart::new(bars)
        .horizontal()
        .color(BAR_COLOR)
        .name("Média salarial anual (USD)");

    let labels = ranked.labels.clone();
    Plot::new("top_titles")
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .x_axis_label("Média salarial anual (USD)")
        .y_axis_formatter(move |mark, _range| {
            let idx = mark.value.round();
            if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

fn histogram_chart(ui: &mut Ui, bars: &[HistogramBar]) {
    let chart = BarChart::new(
        bars.iter()
            .map(|b| Bar::new(b.center, b.count as f64).width(b.width))
            .collect(),
    )
    .color(BAR_COLOR)
    .name("Registros");

    Plot::new("salary_histogram")
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_scroll(false)
        .x_axis_label("Faixa salarial (USD)")
        .show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

// ---------------------------------------------------------------------------
// Donut
// ---------------------------------------------------------------------------

fn donut_chart(ui: &mut Ui, slices: &[DonutSlice]) {
    let size = egui::vec2(ui.available_width(), CHART_HEIGHT);
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let rect = response.rect;
    let center = rect.center();
    let outer = (rect.width().min(rect.height()) / 2.0 - 8.0).max(16.0);
    let inner = outer * 0.5;
    let at = |angle: f32, radius: f32| -> Pos2 { center + egui::vec2(angle.cos(), angle.sin()) * radius };

    let colors = generate_palette(slices.len());
    let mut angle = -TAU / 4.0;
    for (slice, color) in slices.iter().zip(colors) {
        let sweep = slice.fraction as f32 * TAU;
        // Small segments keep each polygon convex.
        let steps = ((sweep / 0.05).ceil() as usize).max(1);
        for s in 0..steps {
            let a0 = angle + sweep * s as f32 / steps as f32;
            let a1 = angle + sweep * (s + 1) as f32 / steps as f32;
            painter.add(Shape::convex_polygon(
                vec![at(a0, inner), at(a0, outer), at(a1, outer), at(a1, inner)],
                color,
                Stroke::NONE,
            ));
        }
        painter.text(
            at(angle + sweep / 2.0, (inner + outer) / 2.0),
            Align2::CENTER_CENTER,
            &slice.text,
            FontId::proportional(12.0),
            Color32::BLACK,
        );
        angle += sweep;
    }

    if let Some(pos) = response.hover_pos() {
        let offset = pos - center;
        let r = offset.length();
        if r >= inner && r <= outer {
            let mut a = offset.y.atan2(offset.x) + TAU / 4.0;
            if a < 0.0 {
                a += TAU;
            }
            let mut acc = 0.0;
            for slice in slices {
                acc += slice.fraction as f32 * TAU;
                if a <= acc {
                    response.on_hover_text(format!("{}: {}", slice.label, slice.count));
                    break;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Country tiles
// ---------------------------------------------------------------------------

/// One coloured tile per country, red (lowest mean) to green (highest).
fn country_tile_map(ui: &mut Ui, tiles: &[CountryTile]) {
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for tile in tiles {
            egui::Frame::group(ui.style())
                .fill(red_yellow_green(tile.scale))
                .show(ui, |ui: &mut Ui| {
                    ui.vertical(|ui: &mut Ui| {
                        ui.label(RichText::new(&tile.iso3).strong().color(Color32::BLACK));
                        ui.label(RichText::new(format_usd(tile.mean)).color(Color32::BLACK));
                    });
                });
        }
    });
}

// ---------------------------------------------------------------------------
// Raw table
// ---------------------------------------------------------------------------

fn raw_table(ui: &mut Ui, view: &FilteredView<'_>) {
    let dataset = view.dataset;
    let columns = export_columns(dataset);
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(400.0)
        .columns(TableColumn::auto().at_least(60.0), columns.len())
        .header(20.0, |mut header| {
            for name in &columns {
                header.col(|ui: &mut Ui| {
                    ui.strong(name.to_string());
                });
            }
        })
        .body(|body| {
            body.rows(18.0, view.len(), |mut row| {
                let record = &dataset.records[view.indices[row.index()]];
                for value in row_values(dataset, record) {
                    row.col(|ui: &mut Ui| {
                        ui.label(value);
                    });
                }
            });
        });
}
