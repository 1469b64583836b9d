use std::borrow::Cow;
use std::path::Path;

use super::error::ExportError;
use super::metrics::{CategoryCount, GroupMean, Histogram, Summary};
use super::model::{Field, FilteredView, SalaryDataset, SalaryRecord};

// ---------------------------------------------------------------------------
// Metric cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: String,
    pub delta: Option<String>,
}

/// Four headline cards, then the year-over-year card when available.
pub fn metric_cards(summary: &Summary) -> Vec<MetricCard> {
    let card = |label, value| MetricCard {
        label,
        value,
        delta: None,
    };
    let mut cards = vec![
        card("Salário médio", format_usd(summary.mean_salary)),
        card("Salário máximo", format_usd(summary.max_salary)),
        card("Total de registros", format_count(summary.record_count)),
        card("Cargo mais frequente", summary.most_frequent_title.clone()),
    ];
    if let Some(yoy) = &summary.year_over_year {
        cards.push(MetricCard {
            label: "Média salarial (último ano)",
            value: format_usd(yoy.last_mean),
            delta: Some(format_delta(yoy.delta)),
        });
    }
    cards
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `$120,000` – whole dollars with thousands separators.
pub fn format_usd(value: f64) -> String {
    if !value.is_finite() {
        return format!("${value}");
    }
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());
    format!("${sign}{}", group_thousands(&digits))
}

/// `1,234`
pub fn format_count(n: usize) -> String {
    group_thousands(&n.to_string())
}

/// `+20.0%` – signed relative change.
pub fn format_delta(delta: f64) -> String {
    format!("{:+.1}%", delta * 100.0)
}

// ---------------------------------------------------------------------------
// Chart layouts
// ---------------------------------------------------------------------------

/// Horizontal ranking: index `i` is drawn at height `i`, so ascending input
/// puts the largest bar on top.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedBars {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

pub fn ranked_bars(groups: &[GroupMean]) -> RankedBars {
    RankedBars {
        labels: groups.iter().map(|g| g.label.clone()).collect(),
        values: groups.iter().map(|g| g.mean).collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBar {
    pub center: f64,
    pub width: f64,
    pub count: usize,
}

pub fn histogram_bars(histogram: &Histogram) -> Vec<HistogramBar> {
    histogram
        .bins
        .iter()
        .map(|b| HistogramBar {
            center: (b.start + b.end) / 2.0,
            width: b.end - b.start,
            count: b.count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DonutSlice {
    pub label: String,
    pub count: usize,
    pub fraction: f64,
    /// `label pct%`, drawn on the slice.
    pub text: String,
}

pub fn donut_slices(counts: &[CategoryCount]) -> Vec<DonutSlice> {
    let total: usize = counts.iter().map(|c| c.count).sum();
    if total == 0 {
        return Vec::new();
    }
    counts
        .iter()
        .map(|c| {
            let fraction = c.count as f64 / total as f64;
            DonutSlice {
                label: c.label.clone(),
                count: c.count,
                fraction,
                text: format!("{} {:.1}%", c.label, fraction * 100.0),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryTile {
    pub iso3: String,
    pub mean: f64,
    /// Position on the colour scale, 0 = lowest mean, 1 = highest.
    pub scale: f64,
}

pub fn country_tiles(means: &[GroupMean]) -> Vec<CountryTile> {
    let min = means.iter().map(|g| g.mean).fold(f64::INFINITY, f64::min);
    let max = means.iter().map(|g| g.mean).fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    means
        .iter()
        .map(|g| CountryTile {
            iso3: g.label.clone(),
            mean: g.mean,
            scale: if range > f64::EPSILON {
                (g.mean - min) / range
            } else {
                0.5
            },
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Table rows and CSV export
// ---------------------------------------------------------------------------

/// Columns of the table view and the export: every source column, with the
/// derived `cargo_norm` appended unless the source already had one.
pub fn export_columns(dataset: &SalaryDataset) -> Vec<Cow<'_, str>> {
    let mut cols: Vec<Cow<'_, str>> = dataset.columns.iter().map(|c| Cow::Borrowed(c.as_str())).collect();
    if !dataset.columns.iter().any(|c| c == Field::CargoNorm.column()) {
        cols.push(Cow::Borrowed(Field::CargoNorm.column()));
    }
    cols
}

/// One row rendered as text, aligned with [`export_columns`]. `ano` is
/// written as the coerced year (empty when it did not parse) and a source
/// `cargo_norm` column is replaced by the derived value.
pub fn row_values(dataset: &SalaryDataset, record: &SalaryRecord) -> Vec<String> {
    let mut values: Vec<String> = dataset
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            if col == Field::CargoNorm.column() {
                record.cargo_norm.clone()
            } else if col == Field::Ano.column() {
                record.ano.map(|y| y.to_string()).unwrap_or_default()
            } else {
                record.cells.get(i).map(|c| c.to_string()).unwrap_or_default()
            }
        })
        .collect();
    if !dataset.columns.iter().any(|c| c == Field::CargoNorm.column()) {
        values.push(record.cargo_norm.clone());
    }
    values
}

/// UTF-8 CSV of the filtered rows. The header is always written, so an
/// empty selection yields a header-only file.
pub fn export_csv(view: &FilteredView<'_>) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(export_columns(view.dataset).iter().map(|c| c.as_bytes()))?;
    for rec in view.records() {
        writer.write_record(row_values(view.dataset, rec))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))
}

pub fn save_export(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    std::fs::write(path, bytes).map_err(|source| ExportError::Save {
        path: path.display().to_string(),
        source,
    })
}
