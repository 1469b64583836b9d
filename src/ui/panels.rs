use std::collections::BTreeSet;

use eframe::egui::{self, Color32, RichText, ScrollArea, TextEdit, Ui};

use crate::data::filter::{Constraint, TEXT_FILTER_FIELDS};
use crate::data::model::Field;
use crate::data::preset::Preset;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// What the user did with one multi-select this frame.
enum MultiSelectEdit<T> {
    Toggle(T),
    All,
}

/// Collapsible checkbox list over every observed value.
fn multiselect<T: Ord + Clone + ToString>(
    ui: &mut Ui,
    field: Field,
    observed: &BTreeSet<T>,
    constraint: &Constraint<T>,
) -> Option<MultiSelectEdit<T>> {
    let n_checked = constraint.checked_count(observed);
    let header_text = format!("{}  ({n_checked}/{})", field.label(), observed.len());
    let mut edit = None;

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(field.column())
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            if constraint.is_active() && ui.small_button("Todos").clicked() {
                edit = Some(MultiSelectEdit::All);
            }
            for val in observed {
                let mut checked = constraint.is_checked(val);
                if ui.checkbox(&mut checked, val.to_string()).changed() {
                    edit = Some(MultiSelectEdit::Toggle(val.clone()));
                }
            }
        });

    edit
}

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("🔍 Filtros");
    ui.separator();

    // Cheap Arc clone so we can mutate state inside the panel.
    let Some(dataset) = state.dataset.clone() else {
        ui.label("Nenhum conjunto de dados carregado.");
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Presets ----
            ui.strong("Presets");
            let mut chosen = state.preset;
            egui::ComboBox::from_id_salt("preset")
                .selected_text(chosen.label())
                .show_ui(ui, |ui: &mut Ui| {
                    for p in Preset::ALL {
                        ui.selectable_value(&mut chosen, p, p.label());
                    }
                });
            if chosen != state.preset {
                state.choose_preset(chosen);
            }
            ui.separator();

            // ---- Per-field multi-selects ----
            if dataset.has(Field::Ano) {
                match multiselect(ui, Field::Ano, &dataset.observed.years, &state.selection.years) {
                    Some(MultiSelectEdit::Toggle(year)) => state.toggle_year(year),
                    Some(MultiSelectEdit::All) => state.select_all(Field::Ano),
                    None => {}
                }
            }

            for field in TEXT_FILTER_FIELDS {
                if !dataset.has(field) {
                    continue;
                }
                let observed = match field {
                    Field::Senioridade => &dataset.observed.seniority,
                    Field::Contrato => &dataset.observed.contract,
                    _ => &dataset.observed.company_size,
                };
                let Some(constraint) = state.selection.text_constraint(field) else {
                    continue;
                };
                match multiselect(ui, field, observed, constraint) {
                    Some(MultiSelectEdit::Toggle(value)) => state.toggle_value(field, &value),
                    Some(MultiSelectEdit::All) => state.select_all(field),
                    None => {}
                }
            }
            ui.separator();

            // ---- Free-text title search ----
            ui.strong("Buscar cargo (texto livre)");
            let mut query = state.selection.query.clone();
            let response = ui.add(
                TextEdit::singleline(&mut query).hint_text("data, engenheiro, analista…"),
            );
            if response.changed() {
                state.set_query(query);
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Arquivo", |ui: &mut Ui| {
            if ui.button("Abrir…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Fonte padrão").clicked() {
                let url = state.config.data_url.clone();
                state.load_source(&url);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} registros carregados, {} visíveis",
                ds.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::YELLOW));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Abrir dados salariais")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_source(&path.to_string_lossy());
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Baixar dados filtrados")
        .set_file_name(state.config.export_file_name.as_str())
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        state.save_export_to(&path);
    }
}
