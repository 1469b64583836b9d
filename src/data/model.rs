use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use super::normalize::normalize_title;

// ---------------------------------------------------------------------------
// Field – the columns the pipeline knows about
// ---------------------------------------------------------------------------

/// Known columns of the salary table. Every one of them is optional in the
/// source; presence is checked once when the dataset is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Ano,
    Senioridade,
    Contrato,
    TamanhoEmpresa,
    Cargo,
    CargoNorm,
    Usd,
    Remoto,
    ResidenciaIso3,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Ano,
        Field::Senioridade,
        Field::Contrato,
        Field::TamanhoEmpresa,
        Field::Cargo,
        Field::CargoNorm,
        Field::Usd,
        Field::Remoto,
        Field::ResidenciaIso3,
    ];

    /// Column name as it appears in the source header.
    pub const fn column(self) -> &'static str {
        match self {
            Field::Ano => "ano",
            Field::Senioridade => "senioridade",
            Field::Contrato => "contrato",
            Field::TamanhoEmpresa => "tamanho_empresa",
            Field::Cargo => "cargo",
            Field::CargoNorm => "cargo_norm",
            Field::Usd => "usd",
            Field::Remoto => "remoto",
            Field::ResidenciaIso3 => "residencia_iso3",
        }
    }

    /// Human label used by the sidebar widgets.
    pub const fn label(self) -> &'static str {
        match self {
            Field::Ano => "Ano",
            Field::Senioridade => "Senioridade",
            Field::Contrato => "Tipo de Contrato",
            Field::TamanhoEmpresa => "Tamanho da Empresa",
            Field::Cargo => "Cargo",
            Field::CargoNorm => "Cargo (normalizado)",
            Field::Usd => "Salário (USD)",
            Field::Remoto => "Tipo de trabalho",
            Field::ResidenciaIso3 => "País",
        }
    }

    pub fn from_column(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---------------------------------------------------------------------------
// CellValue – a single raw cell, kept for export and the table view
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value, kept so export and the table view can
/// reproduce every source column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

/// Renders the cell the way it is written back to CSV: nulls are empty.
impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Best-effort type guess for a raw text cell. Empty text is null.
    pub fn guess(raw: &str) -> CellValue {
        let s = raw.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::Text(s.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    /// Nullable-integer coercion: integral numbers pass, everything else is
    /// null rather than zero.
    pub fn as_year(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            CellValue::Float(_) | CellValue::Text(_) => {
                let v = self.as_f64()?;
                (v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
            }
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// SalaryRecord – one row of the source table
// ---------------------------------------------------------------------------

/// A single salary observation with typed accessors for the known fields.
/// `cells` keeps every source column in header order.
#[derive(Debug, Clone, Default)]
pub struct SalaryRecord {
    pub ano: Option<i64>,
    pub senioridade: Option<String>,
    pub contrato: Option<String>,
    pub tamanho_empresa: Option<String>,
    pub cargo: Option<String>,
    /// Always present once loaded; empty when `cargo` is missing.
    pub cargo_norm: String,
    pub usd: Option<f64>,
    pub remoto: Option<String>,
    pub residencia_iso3: Option<String>,
    pub cells: Vec<CellValue>,
}

impl SalaryRecord {
    /// Build a record from a raw row aligned with `columns`.
    pub fn from_cells(columns: &[String], cells: Vec<CellValue>) -> Self {
        let mut rec = SalaryRecord::default();
        for (name, cell) in columns.iter().zip(cells.iter()) {
            match Field::from_column(name) {
                Some(Field::Ano) => rec.ano = cell.as_year(),
                Some(Field::Usd) => rec.usd = cell.as_f64(),
                Some(Field::Senioridade) => rec.senioridade = cell.as_text(),
                Some(Field::Contrato) => rec.contrato = cell.as_text(),
                Some(Field::TamanhoEmpresa) => rec.tamanho_empresa = cell.as_text(),
                Some(Field::Cargo) => rec.cargo = cell.as_text(),
                Some(Field::Remoto) => rec.remoto = cell.as_text(),
                Some(Field::ResidenciaIso3) => rec.residencia_iso3 = cell.as_text(),
                // Derived below, whatever the source carried.
                Some(Field::CargoNorm) | None => {}
            }
        }
        rec.cargo_norm = normalize_title(rec.cargo.as_deref());
        rec.cells = cells;
        rec
    }

    /// Text value of a categorical field. `ano` and `usd` are not text.
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Senioridade => self.senioridade.as_deref(),
            Field::Contrato => self.contrato.as_deref(),
            Field::TamanhoEmpresa => self.tamanho_empresa.as_deref(),
            Field::Cargo => self.cargo.as_deref(),
            Field::CargoNorm => Some(&self.cargo_norm),
            Field::Remoto => self.remoto.as_deref(),
            Field::ResidenciaIso3 => self.residencia_iso3.as_deref(),
            Field::Ano | Field::Usd => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SalaryDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Distinct non-null values of the filterable fields, sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservedValues {
    pub years: BTreeSet<i64>,
    pub seniority: BTreeSet<String>,
    pub contract: BTreeSet<String>,
    pub company_size: BTreeSet<String>,
}

/// The full parsed dataset. Immutable after construction.
#[derive(Debug, Clone)]
pub struct SalaryDataset {
    /// Source column names, whitespace-trimmed, in header order.
    pub columns: Vec<String>,
    /// Known fields present in the schema. `cargo_norm` is always included.
    pub fields: BTreeSet<Field>,
    pub records: Vec<SalaryRecord>,
    pub observed: ObservedValues,
}

impl SalaryDataset {
    /// Build the typed view from raw rows. Header names are trimmed here.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let columns: Vec<String> = columns.into_iter().map(|c| c.trim().to_string()).collect();

        let mut fields: BTreeSet<Field> = columns
            .iter()
            .filter_map(|c| Field::from_column(c))
            .collect();
        fields.insert(Field::CargoNorm);

        let records: Vec<SalaryRecord> = rows
            .into_iter()
            .map(|cells| SalaryRecord::from_cells(&columns, cells))
            .collect();

        let mut observed = ObservedValues::default();
        for rec in &records {
            if let Some(y) = rec.ano {
                observed.years.insert(y);
            }
            if let Some(s) = &rec.senioridade {
                observed.seniority.insert(s.clone());
            }
            if let Some(s) = &rec.contrato {
                observed.contract.insert(s.clone());
            }
            if let Some(s) = &rec.tamanho_empresa {
                observed.company_size.insert(s.clone());
            }
        }

        SalaryDataset {
            columns,
            fields,
            records,
            observed,
        }
    }

    pub fn has(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every row, unfiltered.
    pub fn full_view(&self) -> FilteredView<'_> {
        FilteredView::new(self, (0..self.len()).collect())
    }
}

// ---------------------------------------------------------------------------
// FilteredView – the dataset after the filter engine
// ---------------------------------------------------------------------------

/// Rows of a dataset that passed the current filters, in source order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub dataset: &'a SalaryDataset,
    pub indices: Cow<'a, [usize]>,
}

impl<'a> FilteredView<'a> {
    pub fn new(dataset: &'a SalaryDataset, indices: Vec<usize>) -> Self {
        Self {
            dataset,
            indices: Cow::Owned(indices),
        }
    }

    /// View over indices cached elsewhere (the session state keeps them).
    pub fn borrowed(dataset: &'a SalaryDataset, indices: &'a [usize]) -> Self {
        Self {
            dataset,
            indices: Cow::Borrowed(indices),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &'a SalaryRecord> + '_ {
        let ds = self.dataset;
        self.indices.iter().map(move |&i| &ds.records[i])
    }

    pub fn has(&self, field: Field) -> bool {
        self.dataset.has(field)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn header_names_are_trimmed_and_fields_detected() {
        let ds = SalaryDataset::from_rows(
            cols(&[" ano ", "usd\t", "outra"]),
            vec![vec![CellValue::Integer(2024), CellValue::Integer(10), CellValue::Null]],
        );
        assert_eq!(ds.columns, cols(&["ano", "usd", "outra"]));
        assert!(ds.has(Field::Ano));
        assert!(ds.has(Field::Usd));
        assert!(ds.has(Field::CargoNorm));
        assert!(!ds.has(Field::Cargo));
    }

    #[test]
    fn year_coercion_is_nullable_not_zero() {
        assert_eq!(CellValue::guess("2024").as_year(), Some(2024));
        assert_eq!(CellValue::guess("2024.0").as_year(), Some(2024));
        assert_eq!(CellValue::guess("2024.5").as_year(), None);
        assert_eq!(CellValue::guess("n/a").as_year(), None);
        assert_eq!(CellValue::guess("").as_year(), None);
    }

    #[test]
    fn cargo_norm_present_without_cargo_column() {
        let ds = SalaryDataset::from_rows(cols(&["usd"]), vec![vec![CellValue::Integer(1)]]);
        assert_eq!(ds.records[0].cargo_norm, "");
        assert!(ds.has(Field::CargoNorm));
    }

    #[test]
    fn observed_values_skip_nulls() {
        let ds = SalaryDataset::from_rows(
            cols(&["ano", "senioridade"]),
            vec![
                vec![CellValue::Integer(2025), CellValue::Text("senior".into())],
                vec![CellValue::Null, CellValue::Null],
                vec![CellValue::Integer(2023), CellValue::Text("junior".into())],
            ],
        );
        assert_eq!(ds.observed.years.iter().copied().collect::<Vec<_>>(), vec![2023, 2025]);
        assert_eq!(ds.observed.seniority.len(), 2);
    }
}
