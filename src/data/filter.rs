use std::borrow::Borrow;
use std::collections::BTreeSet;

use super::model::{Field, FilteredView, SalaryDataset};
use super::normalize::normalize_title;

// ---------------------------------------------------------------------------
// Constraint: which values of one field are allowed
// ---------------------------------------------------------------------------

/// Selection state of a single multi-select.
///
/// `Unconstrained` is the default and is what an "everything checked" widget
/// means. An empty selection is never stored as `RestrictedTo`: it collapses
/// to `Unconstrained` through [`Constraint::from_selected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint<T: Ord> {
    Unconstrained,
    RestrictedTo(BTreeSet<T>),
}

impl<T: Ord> Default for Constraint<T> {
    fn default() -> Self {
        Constraint::Unconstrained
    }
}

impl<T: Ord + Clone> Constraint<T> {
    pub fn from_selected(selected: BTreeSet<T>) -> Self {
        if selected.is_empty() {
            Constraint::Unconstrained
        } else {
            Constraint::RestrictedTo(selected)
        }
    }

    pub fn only(value: T) -> Self {
        Constraint::RestrictedTo(BTreeSet::from([value]))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Constraint::RestrictedTo(_))
    }

    /// Whether a row value passes. A missing value never passes an active
    /// constraint.
    pub fn admits<Q>(&self, value: Option<&Q>) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self {
            Constraint::Unconstrained => true,
            Constraint::RestrictedTo(set) => value.is_some_and(|v| set.contains(v)),
        }
    }

    /// Checkbox state for `value` in a widget listing every observed value.
    pub fn is_checked(&self, value: &T) -> bool {
        match self {
            Constraint::Unconstrained => true,
            Constraint::RestrictedTo(set) => set.contains(value),
        }
    }

    /// Flip one checkbox. Checking the last unchecked value, or unchecking
    /// the last checked one, returns to `Unconstrained`.
    pub fn toggle(&mut self, value: &T, observed: &BTreeSet<T>) {
        let mut selected = match self {
            Constraint::Unconstrained => observed.clone(),
            Constraint::RestrictedTo(set) => set.clone(),
        };
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        *self = if selected == *observed {
            Constraint::Unconstrained
        } else {
            Constraint::from_selected(selected)
        };
    }

    /// Number of checked values out of `observed`, for widget headers.
    pub fn checked_count(&self, observed: &BTreeSet<T>) -> usize {
        match self {
            Constraint::Unconstrained => observed.len(),
            Constraint::RestrictedTo(set) => set.iter().filter(|v| observed.contains(v)).count(),
        }
    }
}

// ---------------------------------------------------------------------------
// FilterSelection: the full set of user constraints
// ---------------------------------------------------------------------------

/// Snapshot of the sidebar. Rebuilt on every user edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub years: Constraint<i64>,
    pub seniority: Constraint<String>,
    pub contract: Constraint<String>,
    pub company_size: Constraint<String>,
    /// Free-text job title query, normalized before matching.
    pub query: String,
}

impl FilterSelection {
    /// Constraint of a categorical text field, if that field is filterable.
    pub fn text_constraint(&self, field: Field) -> Option<&Constraint<String>> {
        match field {
            Field::Senioridade => Some(&self.seniority),
            Field::Contrato => Some(&self.contract),
            Field::TamanhoEmpresa => Some(&self.company_size),
            _ => None,
        }
    }

    pub fn text_constraint_mut(&mut self, field: Field) -> Option<&mut Constraint<String>> {
        match field {
            Field::Senioridade => Some(&mut self.seniority),
            Field::Contrato => Some(&mut self.contract),
            Field::TamanhoEmpresa => Some(&mut self.company_size),
            _ => None,
        }
    }
}

/// Filterable text fields, in sidebar order.
pub const TEXT_FILTER_FIELDS: [Field; 3] = [Field::Senioridade, Field::Contrato, Field::TamanhoEmpresa];

// ---------------------------------------------------------------------------
// Filter engine
// ---------------------------------------------------------------------------

/// Return the rows of `dataset` that pass every active constraint.
///
/// * Constraints on fields absent from the schema are skipped.
/// * A row missing a value for an active field is excluded.
/// * The query matches as a substring of `cargo_norm` after normalization;
///   an empty query matches everything.
pub fn apply_filters<'a>(dataset: &'a SalaryDataset, selection: &FilterSelection) -> FilteredView<'a> {
    let years = (selection.years.is_active() && dataset.has(Field::Ano)).then_some(&selection.years);

    let text: Vec<(Field, &Constraint<String>)> = TEXT_FILTER_FIELDS
        .into_iter()
        .filter(|f| dataset.has(*f))
        .filter_map(|f| selection.text_constraint(f).map(|c| (f, c)))
        .filter(|(_, c)| c.is_active())
        .collect();

    let query = normalize_title(Some(&selection.query));

    let indices = dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            if let Some(years) = years {
                if !years.admits(rec.ano.as_ref()) {
                    return false;
                }
            }
            if !text.iter().all(|(field, c)| c.admits(rec.text(*field))) {
                return false;
            }
            query.is_empty() || rec.cargo_norm.contains(&query)
        })
        .map(|(i, _)| i)
        .collect();

    FilteredView::new(dataset, indices)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data::model::CellValue;

    fn dataset(rows: &[(Option<i64>, Option<&str>, &str)]) -> SalaryDataset {
        let columns = vec!["ano".to_string(), "senioridade".to_string(), "cargo".to_string()];
        let rows = rows
            .iter()
            .map(|(ano, sen, cargo)| {
                vec![
                    ano.map(CellValue::Integer).unwrap_or(CellValue::Null),
                    sen.map(|s| CellValue::Text(s.to_string())).unwrap_or(CellValue::Null),
                    CellValue::Text(cargo.to_string()),
                ]
            })
            .collect();
        SalaryDataset::from_rows(columns, rows)
    }

    fn sample() -> SalaryDataset {
        dataset(&[
            (Some(2024), Some("senior"), "Analista de Dados"),
            (Some(2025), Some("pleno"), "Engenheiro de Dados"),
            (None, None, "Data Scientist"),
        ])
    }

    #[test]
    fn default_selection_is_identity() {
        let ds = sample();
        let view = apply_filters(&ds, &FilterSelection::default());
        assert_eq!(view.indices.as_ref(), &[0, 1, 2]);
    }

    #[test]
    fn empty_sets_collapse_to_unconstrained() {
        let ds = sample();
        let selection = FilterSelection {
            years: Constraint::from_selected(BTreeSet::new()),
            seniority: Constraint::from_selected(BTreeSet::new()),
            ..Default::default()
        };
        assert_eq!(selection.years, Constraint::Unconstrained);
        assert_eq!(apply_filters(&ds, &selection).len(), 3);
    }

    #[test]
    fn active_filter_drops_rows_missing_the_field() {
        let ds = sample();
        let selection = FilterSelection {
            years: Constraint::from_selected(BTreeSet::from([2024, 2025])),
            ..Default::default()
        };
        assert_eq!(apply_filters(&ds, &selection).indices.as_ref(), &[0, 1]);
    }

    #[test]
    fn filters_on_absent_columns_are_skipped() {
        let ds = sample();
        let selection = FilterSelection {
            contract: Constraint::only("CLT".to_string()),
            ..Default::default()
        };
        assert_eq!(apply_filters(&ds, &selection).len(), 3);
    }

    #[test]
    fn query_is_normalized_substring() {
        let ds = dataset(&[
            (Some(2024), None, "Analista de Dados"),
            (Some(2024), None, "Engenheiro de Dados"),
        ]);
        let selection = FilterSelection {
            query: "analist".into(),
            ..Default::default()
        };
        assert_eq!(apply_filters(&ds, &selection).indices.as_ref(), &[0]);

        let shouted = FilterSelection {
            query: "  ENGENHEIRO!! ".into(),
            ..Default::default()
        };
        assert_eq!(apply_filters(&ds, &shouted).indices.as_ref(), &[1]);
    }

    #[test]
    fn filters_compose_with_and() {
        let ds = sample();
        let selection = FilterSelection {
            years: Constraint::from_selected(BTreeSet::from([2024, 2025])),
            seniority: Constraint::only("pleno".to_string()),
            query: "dados".into(),
            ..Default::default()
        };
        assert_eq!(apply_filters(&ds, &selection).indices.as_ref(), &[1]);
    }

    #[test]
    fn toggle_returns_to_unconstrained_when_all_checked() {
        let observed = BTreeSet::from([2024, 2025]);
        let mut c = Constraint::Unconstrained;
        c.toggle(&2024, &observed);
        assert_eq!(c, Constraint::only(2025));
        assert_eq!(c.checked_count(&observed), 1);
        c.toggle(&2024, &observed);
        assert_eq!(c, Constraint::Unconstrained);

        // Unchecking the last value leaves nothing selected: no constraint.
        let mut single = Constraint::only(2025);
        single.toggle(&2025, &observed);
        assert_eq!(single, Constraint::Unconstrained);
    }

    proptest! {
        #[test]
        fn single_active_filter_only_keeps_allowed_values(
            rows in prop::collection::vec((prop::option::of(0usize..4), 0usize..3), 0..40),
            allowed in prop::collection::btree_set(0usize..4, 1..4),
        ) {
            const LEVELS: [&str; 4] = ["junior", "pleno", "senior", "executivo"];
            let typed: Vec<(Option<i64>, Option<&str>, &str)> = rows
                .iter()
                .map(|(s, c)| (Some(2020 + *c as i64), s.map(|i| LEVELS[i]), "Cargo"))
                .collect();
            let ds = dataset(&typed);
            let allowed: BTreeSet<String> = allowed.into_iter().map(|i| LEVELS[i].to_string()).collect();
            let selection = FilterSelection {
                seniority: Constraint::from_selected(allowed.clone()),
                ..Default::default()
            };
            let view = apply_filters(&ds, &selection);
            for rec in view.records() {
                let value = rec.senioridade.as_deref();
                prop_assert!(value.is_some_and(|v| allowed.contains(v)));
            }
            let expected = ds
                .records
                .iter()
                .filter(|r| r.senioridade.as_deref().is_some_and(|v| allowed.contains(v)))
                .count();
            prop_assert_eq!(view.len(), expected);
        }

        #[test]
        fn unconstrained_selection_keeps_everything(n in 0usize..30) {
            let typed: Vec<(Option<i64>, Option<&str>, &str)> =
                (0..n).map(|i| (Some(2020 + (i % 3) as i64), None, "x")).collect();
            let ds = dataset(&typed);
            let view = apply_filters(&ds, &FilterSelection::default());
            prop_assert_eq!(view.indices.to_vec(), (0..n).collect::<Vec<_>>());
        }
    }
}
