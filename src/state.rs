use std::path::Path;
use std::sync::Arc;

use crate::config::DashboardConfig;
use crate::data::filter::{apply_filters, FilterSelection};
use crate::data::loader::{DatasetCache, SourceFetcher};
use crate::data::metrics::{
    mean_salary_by_country_for_title, salary_histogram, top_n_by_mean_salary,
    work_mode_distribution, Aggregate, Summary,
};
use crate::data::model::{Field, FilteredView, SalaryDataset};
use crate::data::present::{
    country_tiles, donut_slices, export_csv, histogram_bars, metric_cards, ranked_bars,
    save_export, CountryTile, DonutSlice, HistogramBar, MetricCard, RankedBars,
};
use crate::data::preset::{resolve, Preset};

// ---------------------------------------------------------------------------
// Derived panels
// ---------------------------------------------------------------------------

/// Everything the main panel shows, recomputed in one pass whenever the
/// selection changes.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub cards: Vec<MetricCard>,
    pub ranking: Aggregate<RankedBars>,
    pub histogram: Aggregate<Vec<HistogramBar>>,
    pub work_modes: Aggregate<Vec<DonutSlice>>,
    pub countries: Aggregate<Vec<CountryTile>>,
}

impl DashboardView {
    pub fn compute(view: &FilteredView<'_>, config: &DashboardConfig) -> Self {
        DashboardView {
            cards: metric_cards(&Summary::compute(view)),
            ranking: top_n_by_mean_salary(view, Field::Cargo, config.top_n)
                .map(|groups| ranked_bars(&groups)),
            histogram: salary_histogram(view, config.histogram_bins).map(|h| histogram_bars(&h)),
            work_modes: work_mode_distribution(view).map(|counts| donut_slices(&counts)),
            countries: mean_salary_by_country_for_title(view, &config.focus_title)
                .map(|means| country_tiles(&means)),
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Memoized loader, shared by every source the session opens.
    cache: DatasetCache<SourceFetcher>,

    /// Source of the current dataset (URL or local path).
    pub source: String,

    /// Loaded dataset (None until a load succeeds).
    pub dataset: Option<Arc<SalaryDataset>>,

    /// Current sidebar constraints.
    pub selection: FilterSelection,

    /// Last preset chosen in the sidebar.
    pub preset: Preset,

    /// Indices of records passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Panels derived from `visible_indices`.
    pub panels: Option<DashboardView>,

    /// Load failure. Fatal for the session until a retry succeeds.
    pub load_error: Option<String>,

    /// Non-fatal notice shown in the top bar.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        let cache = DatasetCache::new(SourceFetcher::new(config.request_timeout()));
        Self {
            source: config.data_url.clone(),
            config,
            cache,
            dataset: None,
            selection: FilterSelection::default(),
            preset: Preset::default(),
            visible_indices: Vec::new(),
            panels: None,
            load_error: None,
            status_message: None,
        }
    }

    /// Load `source` through the cache and make it the current dataset.
    pub fn load_source(&mut self, source: &str) {
        self.source = source.to_string();
        let cached = self.cache.is_cached(source);
        match self.cache.load(source) {
            Ok(dataset) => {
                self.set_dataset(dataset);
                if cached {
                    self.status_message = Some("Dados reutilizados do cache".to_string());
                }
            }
            Err(e) => {
                log::error!("Failed to load {source}: {e}");
                self.load_error = Some(format!("Erro ao carregar os dados: {e}"));
            }
        }
    }

    /// Retry the current source. Cached sources are not fetched again.
    pub fn reload(&mut self) {
        let source = self.source.clone();
        self.load_source(&source);
    }

    /// Ingest a dataset and reset filters to "everything selected".
    pub fn set_dataset(&mut self, dataset: Arc<SalaryDataset>) {
        self.dataset = Some(dataset);
        self.selection = FilterSelection::default();
        self.preset = Preset::default();
        self.load_error = None;
        self.status_message = None;
        self.refilter();
    }

    /// Filtered view over the current dataset.
    pub fn view(&self) -> Option<FilteredView<'_>> {
        self.dataset
            .as_deref()
            .map(|ds| FilteredView::borrowed(ds, &self.visible_indices))
    }

    /// Recompute `visible_indices` and every panel after a change.
    pub fn refilter(&mut self) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let view = apply_filters(ds, &self.selection);
        log::debug!("filters keep {} of {} records", view.len(), ds.len());
        self.panels = Some(DashboardView::compute(&view, &self.config));
        self.visible_indices = view.indices.into_owned();
    }

    /// Apply a preset once. "Todos" clears every categorical constraint;
    /// the others override only the fields they name.
    pub fn choose_preset(&mut self, preset: Preset) {
        self.preset = preset;
        let Some(ds) = &self.dataset else {
            return;
        };
        match preset {
            Preset::Todos => {
                let query = std::mem::take(&mut self.selection.query);
                self.selection = FilterSelection {
                    query,
                    ..Default::default()
                };
            }
            other => resolve(other, ds).apply(&mut self.selection),
        }
        self.refilter();
    }

    /// Flip one year checkbox.
    pub fn toggle_year(&mut self, year: i64) {
        let Some(ds) = &self.dataset else {
            return;
        };
        self.selection.years.toggle(&year, &ds.observed.years);
        self.refilter();
    }

    /// Flip one value of a categorical text field.
    pub fn toggle_value(&mut self, field: Field, value: &str) {
        let Some(ds) = &self.dataset else {
            return;
        };
        let observed = match field {
            Field::Senioridade => &ds.observed.seniority,
            Field::Contrato => &ds.observed.contract,
            Field::TamanhoEmpresa => &ds.observed.company_size,
            _ => return,
        };
        let Some(c) = self.selection.text_constraint_mut(field) else {
            return;
        };
        c.toggle(&value.to_string(), observed);
        self.refilter();
    }

    /// Select every value of a field again.
    pub fn select_all(&mut self, field: Field) {
        match field {
            Field::Ano => self.selection.years = Default::default(),
            other => match self.selection.text_constraint_mut(other) {
                Some(c) => *c = Default::default(),
                None => return,
            },
        }
        self.refilter();
    }

    pub fn set_query(&mut self, query: String) {
        if self.selection.query != query {
            self.selection.query = query;
            self.refilter();
        }
    }

    /// Serialize the filtered rows and write them to `path`, reporting the
    /// outcome in the status line. The CSV is only built here, when the
    /// user asks for it.
    pub fn save_export_to(&mut self, path: &Path) {
        let written = self
            .view()
            .map(|view| export_csv(&view).and_then(|bytes| save_export(path, &bytes)));
        let Some(written) = written else {
            self.status_message = Some("Nada para exportar.".to_string());
            return;
        };
        match written {
            Ok(()) => {
                log::info!("Exported {} records to {}", self.visible_indices.len(), path.display());
                self.status_message = Some(format!("Dados salvos em {}", path.display()));
            }
            Err(e) => {
                log::warn!("CSV export failed: {e}");
                self.status_message = Some(format!("Falha ao salvar CSV: {e}"));
            }
        }
    }
}
