use std::collections::BTreeMap;
use std::fmt;

use super::model::{Field, FilteredView};

// ---------------------------------------------------------------------------
// Result type for every aggregate
// ---------------------------------------------------------------------------

/// Why an aggregate has no value. Each variant maps to a visible, non-fatal
/// notice in the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Unavailable {
    /// The filters excluded every row.
    EmptySelection,
    /// A column the aggregate needs is not in the dataset.
    MissingField(Field),
    /// The column exists but every remaining value is null.
    NoValues(Field),
    /// Year-over-year needs at least two distinct years.
    InsufficientYears,
    /// No row matched a fixed sub-filter (e.g. a specific job title).
    NoMatches(String),
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::EmptySelection => {
                write!(f, "Nenhum registro corresponde aos filtros atuais.")
            }
            Unavailable::MissingField(field) => write!(f, "Coluna '{field}' ausente nos dados."),
            Unavailable::NoValues(field) => {
                write!(f, "Sem valores de '{field}' na seleção atual.")
            }
            Unavailable::InsufficientYears => {
                write!(f, "São necessários pelo menos dois anos na seleção.")
            }
            Unavailable::NoMatches(what) => {
                write!(f, "Nenhum registro de '{what}' na seleção atual.")
            }
        }
    }
}

/// Either a computed value or the reason it could not be computed.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate<T> {
    Ready(T),
    Unavailable(Unavailable),
}

impl<T> Aggregate<T> {
    /// Collapse to the documented default.
    pub fn value_or(self, default: T) -> T {
        match self {
            Aggregate::Ready(v) => v,
            Aggregate::Unavailable(_) => default,
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Aggregate::Ready(v) => Some(v),
            Aggregate::Unavailable(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&Unavailable> {
        match self {
            Aggregate::Ready(_) => None,
            Aggregate::Unavailable(r) => Some(r),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Aggregate<U> {
        match self {
            Aggregate::Ready(v) => Aggregate::Ready(f(v)),
            Aggregate::Unavailable(r) => Aggregate::Unavailable(r),
        }
    }
}

impl<T> From<Result<T, Unavailable>> for Aggregate<T> {
    fn from(res: Result<T, Unavailable>) -> Self {
        match res {
            Ok(v) => Aggregate::Ready(v),
            Err(r) => Aggregate::Unavailable(r),
        }
    }
}

/// Empty selection first, then each required column in order.
fn require(view: &FilteredView<'_>, fields: &[Field]) -> Result<(), Unavailable> {
    if view.is_empty() {
        return Err(Unavailable::EmptySelection);
    }
    match fields.iter().find(|f| !view.has(**f)) {
        Some(f) => Err(Unavailable::MissingField(*f)),
        None => Ok(()),
    }
}

fn salaries(view: &FilteredView<'_>) -> Vec<f64> {
    view.records().filter_map(|r| r.usd).collect()
}

/// Mean of `usd` per key, keys in sorted order. Rows without a salary do not
/// count towards their group.
fn group_means<K: Ord>(pairs: impl Iterator<Item = (K, f64)>) -> BTreeMap<K, f64> {
    let mut acc: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for (k, v) in pairs {
        let e = acc.entry(k).or_insert((0.0, 0));
        e.0 += v;
        e.1 += 1;
    }
    acc.into_iter()
        .map(|(k, (sum, n))| (k, sum / n as f64))
        .collect()
}

// ---------------------------------------------------------------------------
// Headline metrics
// ---------------------------------------------------------------------------

/// Arithmetic mean of `usd`. Default 0.
pub fn mean_salary(view: &FilteredView<'_>) -> Aggregate<f64> {
    let run = || -> Result<f64, Unavailable> {
        require(view, &[Field::Usd])?;
        let (sum, n) = salaries(view).into_iter().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        if n == 0 {
            return Err(Unavailable::NoValues(Field::Usd));
        }
        Ok(sum / n as f64)
    };
    run().into()
}

/// Maximum of `usd`. Default 0.
pub fn max_salary(view: &FilteredView<'_>) -> Aggregate<f64> {
    let run = || -> Result<f64, Unavailable> {
        require(view, &[Field::Usd])?;
        salaries(view)
            .into_iter()
            .reduce(f64::max)
            .ok_or(Unavailable::NoValues(Field::Usd))
    };
    run().into()
}

pub fn record_count(view: &FilteredView<'_>) -> usize {
    view.len()
}

/// Most common `cargo`. Among ties the first title in sorted order wins.
/// Default `""`.
pub fn most_frequent_title(view: &FilteredView<'_>) -> Aggregate<String> {
    let run = || -> Result<String, Unavailable> {
        require(view, &[Field::Cargo])?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for title in view.records().filter_map(|r| r.cargo.as_deref()) {
            *counts.entry(title).or_default() += 1;
        }
        let mut best: Option<(&str, usize)> = None;
        for (title, n) in counts {
            if best.map_or(true, |(_, b)| n > b) {
                best = Some((title, n));
            }
        }
        best.map(|(t, _)| t.to_string())
            .ok_or(Unavailable::NoValues(Field::Cargo))
    };
    run().into()
}

// ---------------------------------------------------------------------------
// Year over year
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearOverYear {
    pub last_year: i64,
    pub last_mean: f64,
    pub prev_year: i64,
    pub prev_mean: f64,
    /// `(last - prev) / prev`, or 0 when `prev` is 0.
    pub delta: f64,
}

/// Mean `usd` per year, ascending by year.
pub fn mean_salary_by_year(view: &FilteredView<'_>) -> Aggregate<Vec<(i64, f64)>> {
    let run = || -> Result<Vec<(i64, f64)>, Unavailable> {
        require(view, &[Field::Ano, Field::Usd])?;
        let means = group_means(view.records().filter_map(|r| Some((r.ano?, r.usd?))));
        Ok(means.into_iter().collect())
    };
    run().into()
}

/// Compare the two most recent years that have salary data.
pub fn year_over_year(view: &FilteredView<'_>) -> Aggregate<YearOverYear> {
    let run = || -> Result<YearOverYear, Unavailable> {
        let by_year = mean_salary_by_year(view)
            .ok()
            .ok_or(Unavailable::InsufficientYears)?;
        let &[.., (prev_year, prev_mean), (last_year, last_mean)] = by_year.as_slice() else {
            return Err(Unavailable::InsufficientYears);
        };
        let delta = if prev_mean == 0.0 {
            0.0
        } else {
            (last_mean - prev_mean) / prev_mean
        };
        Ok(YearOverYear {
            last_year,
            last_mean,
            prev_year,
            prev_mean,
            delta,
        })
    };
    run().into()
}

// ---------------------------------------------------------------------------
// Grouped aggregates for the charts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GroupMean {
    pub label: String,
    pub mean: f64,
}

/// The `n` groups of `field` with the highest mean salary, returned in
/// ascending order of mean. Among equal means the earlier group in sorted
/// order is kept.
pub fn top_n_by_mean_salary(view: &FilteredView<'_>, field: Field, n: usize) -> Aggregate<Vec<GroupMean>> {
    let run = || -> Result<Vec<GroupMean>, Unavailable> {
        require(view, &[Field::Usd, field])?;
        let means = group_means(
            view.records()
                .filter_map(|r| Some((r.text(field)?.to_string(), r.usd?))),
        );
        if means.is_empty() {
            return Err(Unavailable::NoValues(field));
        }
        let mut groups: Vec<GroupMean> = means
            .into_iter()
            .map(|(label, mean)| GroupMean { label, mean })
            .collect();
        groups.sort_by(|a, b| b.mean.total_cmp(&a.mean));
        groups.truncate(n);
        groups.sort_by(|a, b| a.mean.total_cmp(&b.mean));
        Ok(groups)
    };
    run().into()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

/// Equal-width bins spanning min..=max of `usd`. The last bin is closed on
/// the right. A single distinct value gets bins of unit total width centred
/// on it.
pub fn salary_histogram(view: &FilteredView<'_>, bins: usize) -> Aggregate<Histogram> {
    let run = || -> Result<Histogram, Unavailable> {
        require(view, &[Field::Usd])?;
        let values = salaries(view);
        let bins = bins.max(1);
        let min = values.iter().copied().reduce(f64::min);
        let max = values.iter().copied().reduce(f64::max);
        let (Some(min), Some(max)) = (min, max) else {
            return Err(Unavailable::NoValues(Field::Usd));
        };

        let (start, span) = if max > min {
            (min, max - min)
        } else {
            (min - 0.5, 1.0)
        };
        let width = span / bins as f64;

        let mut out: Vec<HistogramBin> = (0..bins)
            .map(|i| HistogramBin {
                start: start + width * i as f64,
                end: start + width * (i + 1) as f64,
                count: 0,
            })
            .collect();
        for v in values {
            let idx = (((v - start) / width).floor() as usize).min(bins - 1);
            out[idx].count += 1;
        }
        Ok(Histogram { bins: out })
    };
    run().into()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

/// Rows per work mode, most frequent first.
pub fn work_mode_distribution(view: &FilteredView<'_>) -> Aggregate<Vec<CategoryCount>> {
    let run = || -> Result<Vec<CategoryCount>, Unavailable> {
        require(view, &[Field::Remoto])?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for mode in view.records().filter_map(|r| r.remoto.as_deref()) {
            *counts.entry(mode).or_default() += 1;
        }
        if counts.is_empty() {
            return Err(Unavailable::NoValues(Field::Remoto));
        }
        let mut out: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(label, count)| CategoryCount {
                label: label.to_string(),
                count,
            })
            .collect();
        out.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(out)
    };
    run().into()
}

/// Mean salary per residence country among rows whose `cargo` equals
/// `title` exactly.
pub fn mean_salary_by_country_for_title(view: &FilteredView<'_>, title: &str) -> Aggregate<Vec<GroupMean>> {
    let run = || -> Result<Vec<GroupMean>, Unavailable> {
        require(view, &[Field::ResidenciaIso3, Field::Cargo, Field::Usd])?;
        let matching: Vec<_> = view
            .records()
            .filter(|r| r.cargo.as_deref() == Some(title))
            .collect();
        if matching.is_empty() {
            return Err(Unavailable::NoMatches(title.to_string()));
        }
        let means = group_means(
            matching
                .iter()
                .filter_map(|r| Some((r.residencia_iso3.clone()?, r.usd?))),
        );
        if means.is_empty() {
            return Err(Unavailable::NoValues(Field::ResidenciaIso3));
        }
        Ok(means
            .into_iter()
            .map(|(label, mean)| GroupMean { label, mean })
            .collect())
    };
    run().into()
}

// ---------------------------------------------------------------------------
// Summary bundle for the metric cards
// ---------------------------------------------------------------------------

/// The four headline metrics plus the optional year-over-year card, with
/// defaults already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub mean_salary: f64,
    pub max_salary: f64,
    pub record_count: usize,
    pub most_frequent_title: String,
    pub year_over_year: Option<YearOverYear>,
}

impl Summary {
    pub fn compute(view: &FilteredView<'_>) -> Self {
        Summary {
            mean_salary: mean_salary(view).value_or(0.0),
            max_salary: max_salary(view).value_or(0.0),
            record_count: record_count(view),
            most_frequent_title: most_frequent_title(view).value_or(String::new()),
            year_over_year: year_over_year(view).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{apply_filters, FilterSelection};
    use crate::data::loader::parse_csv;
    use crate::data::model::SalaryDataset;
    use crate::data::preset::{resolve, Preset};

    fn ds(csv: &str) -> SalaryDataset {
        parse_csv(csv.as_bytes()).unwrap()
    }

    const TWO_YEARS: &str =
        "ano,cargo,usd,senioridade\n2024,Engenheiro,100000,senior\n2025,Engenheiro,120000,senior\n";

    #[test]
    fn end_to_end_senior_2025() {
        let data = ds(TWO_YEARS);
        let mut selection = FilterSelection::default();
        resolve(Preset::Senior2025, &data).apply(&mut selection);
        let view = apply_filters(&data, &selection);
        assert_eq!(mean_salary(&view), Aggregate::Ready(120000.0));

        let yoy = year_over_year(&data.full_view()).ok().unwrap();
        assert_eq!(yoy.last_year, 2025);
        assert_eq!(yoy.last_mean, 120000.0);
        assert!((yoy.delta - 0.20).abs() < 1e-12);
    }

    #[test]
    fn empty_view_uses_defaults() {
        let data = ds(TWO_YEARS);
        let view = FilteredView::new(&data, Vec::new());
        assert_eq!(mean_salary(&view), Aggregate::Unavailable(Unavailable::EmptySelection));
        let summary = Summary::compute(&view);
        assert_eq!(summary.mean_salary, 0.0);
        assert_eq!(summary.max_salary, 0.0);
        assert_eq!(summary.record_count, 0);
        assert_eq!(summary.most_frequent_title, "");
        assert_eq!(summary.year_over_year, None);
    }

    #[test]
    fn missing_salary_column_is_reported() {
        let data = ds("ano,cargo\n2024,A\n");
        let view = data.full_view();
        assert_eq!(
            max_salary(&view),
            Aggregate::Unavailable(Unavailable::MissingField(Field::Usd))
        );
        assert_eq!(Summary::compute(&view).mean_salary, 0.0);
        assert!(salary_histogram(&view, 30).reason().is_some());
    }

    #[test]
    fn single_year_has_no_yoy() {
        let data = ds("ano,usd\n2024,10\n2024,20\n");
        assert_eq!(
            year_over_year(&data.full_view()),
            Aggregate::Unavailable(Unavailable::InsufficientYears)
        );
    }

    #[test]
    fn yoy_with_zero_previous_mean_is_zero() {
        let data = ds("ano,usd\n2023,0\n2024,50\n");
        let yoy = year_over_year(&data.full_view()).ok().unwrap();
        assert_eq!(yoy.prev_mean, 0.0);
        assert_eq!(yoy.delta, 0.0);
    }

    #[test]
    fn yoy_uses_two_most_recent_years() {
        let data = ds("ano,usd\n2025,300\n2021,10\n2024,200\n,999\n");
        let yoy = year_over_year(&data.full_view()).ok().unwrap();
        assert_eq!((yoy.prev_year, yoy.last_year), (2024, 2025));
        assert!((yoy.delta - 0.5).abs() < 1e-12);
    }

    #[test]
    fn most_frequent_title_breaks_ties_by_sorted_order() {
        let data = ds("cargo\nZeta\nAlfa\nZeta\nAlfa\nBeta\n");
        assert_eq!(most_frequent_title(&data.full_view()).value_or(String::new()), "Alfa");
    }

    #[test]
    fn top_n_returns_all_groups_ascending_when_fewer_than_n() {
        let data = ds("cargo,usd\nA,300\nB,100\nC,200\nA,100\n");
        let top = top_n_by_mean_salary(&data.full_view(), Field::Cargo, 10)
            .ok()
            .unwrap();
        let labels: Vec<_> = top.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["B", "A", "C"]);
        assert_eq!(top[1].mean, 200.0);
    }

    #[test]
    fn top_n_keeps_the_largest() {
        let rows: String = (0..15).map(|i| format!("T{i:02},{}\n", i * 1000)).collect();
        let data = ds(&format!("cargo,usd\n{rows}"));
        let top = top_n_by_mean_salary(&data.full_view(), Field::Cargo, 10)
            .ok()
            .unwrap();
        assert_eq!(top.len(), 10);
        assert_eq!(top.first().map(|g| g.label.as_str()), Some("T05"));
        assert_eq!(top.last().map(|g| g.label.as_str()), Some("T14"));
    }

    #[test]
    fn histogram_covers_every_value() {
        let data = ds("usd\n0\n10\n20\n30\n300\n");
        let h = salary_histogram(&data.full_view(), 30).ok().unwrap();
        assert_eq!(h.bins.len(), 30);
        assert_eq!(h.bins.iter().map(|b| b.count).sum::<usize>(), 5);
        assert_eq!(h.bins[0].start, 0.0);
        assert_eq!(h.bins[29].end, 300.0);
        assert_eq!(h.bins[29].count, 1);
    }

    #[test]
    fn histogram_of_a_single_value() {
        let data = ds("usd\n50\n50\n");
        let h = salary_histogram(&data.full_view(), 30).ok().unwrap();
        assert_eq!(h.bins.iter().map(|b| b.count).sum::<usize>(), 2);
        let filled: Vec<_> = h.bins.iter().filter(|b| b.count > 0).collect();
        assert_eq!(filled.len(), 1);
        assert_eq!(filled[0].count, 2);
        assert!(h.bins[0].start >= 49.0 && h.bins[29].end <= 51.0);
    }

    #[test]
    fn work_modes_counted_most_frequent_first() {
        let data = ds("remoto\nremoto\npresencial\nremoto\n\nhibrido\n");
        let dist = work_mode_distribution(&data.full_view()).ok().unwrap();
        assert_eq!(dist[0], CategoryCount { label: "remoto".into(), count: 2 });
        assert_eq!(dist.iter().map(|c| c.count).sum::<usize>(), 4);
    }

    #[test]
    fn country_means_for_exact_title() {
        let data = ds(
            "cargo,residencia_iso3,usd\nData Scientist,BRA,100\nData Scientist,BRA,200\ndata scientist,USA,999\nData Scientist,USA,300\n",
        );
        let by_country = mean_salary_by_country_for_title(&data.full_view(), "Data Scientist")
            .ok()
            .unwrap();
        assert_eq!(
            by_country,
            vec![
                GroupMean { label: "BRA".into(), mean: 150.0 },
                GroupMean { label: "USA".into(), mean: 300.0 },
            ]
        );
    }

    #[test]
    fn country_means_without_matches_report_no_data() {
        let data = ds("cargo,residencia_iso3,usd\nAnalista,BRA,100\n");
        assert_eq!(
            mean_salary_by_country_for_title(&data.full_view(), "Data Scientist"),
            Aggregate::Unavailable(Unavailable::NoMatches("Data Scientist".into()))
        );
    }
}
