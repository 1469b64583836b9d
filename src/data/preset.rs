use std::collections::BTreeSet;

use super::filter::{Constraint, FilterSelection};
use super::model::SalaryDataset;

/// Named shortcuts offered in the sidebar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Preset {
    #[default]
    Todos,
    Senior2025,
    Remoto2024,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Todos, Preset::Senior2025, Preset::Remoto2024];

    pub const fn label(self) -> &'static str {
        match self {
            Preset::Todos => "Todos",
            Preset::Senior2025 => "Sênior 2025",
            Preset::Remoto2024 => "Remoto - 2024",
        }
    }
}

/// Partial selection produced by a preset. `None` leaves the field as the
/// user had it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionOverride {
    pub years: Option<Constraint<i64>>,
    pub seniority: Option<Constraint<String>>,
}

impl SelectionOverride {
    /// Apply onto the current selection, once. Nothing of the preset is
    /// remembered afterwards, so later edits win.
    pub fn apply(self, selection: &mut FilterSelection) {
        if let Some(years) = self.years {
            selection.years = years;
        }
        if let Some(seniority) = self.seniority {
            selection.seniority = seniority;
        }
    }
}

/// Resolve a preset against the values observed in `dataset`.
pub fn resolve(preset: Preset, dataset: &SalaryDataset) -> SelectionOverride {
    let observed = &dataset.observed;
    let year_if_observed = |year: i64| {
        observed
            .years
            .contains(&year)
            .then(|| Constraint::only(year))
    };

    match preset {
        Preset::Todos => SelectionOverride::default(),
        Preset::Senior2025 => {
            let senior: BTreeSet<String> = observed
                .seniority
                .iter()
                .filter(|s| s.to_lowercase().contains("senior"))
                .cloned()
                .collect();
            // An unmatched preset must not exclude everything: fall back to
            // every observed level.
            let seniority = if senior.is_empty() {
                observed.seniority.clone()
            } else {
                senior
            };
            SelectionOverride {
                years: year_if_observed(2025),
                seniority: Some(Constraint::from_selected(seniority)),
            }
        }
        Preset::Remoto2024 => SelectionOverride {
            years: year_if_observed(2024),
            seniority: None,
        },
    }
}
