/// Data layer: loading, filtering, aggregation and export.
///
/// Architecture:
/// ```text
///  URL / .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  fetch (cached per source) → SalaryDataset
///   └──────────┘   cargo_norm derived via normalize
///        │
///        ▼
///   ┌──────────┐
///   │  preset   │  optional one-shot override of the FilterSelection
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply constraints → FilteredView
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │ metrics   │   │ present   │  chart layouts, CSV export
///   └──────────┘   └──────────┘
/// ```

pub mod error;
pub mod filter;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod normalize;
pub mod present;
pub mod preset;
