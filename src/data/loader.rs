use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::error::FetchError;
use super::model::{CellValue, SalaryDataset};

// ---------------------------------------------------------------------------
// Fetching raw bytes
// ---------------------------------------------------------------------------

/// Where dataset bytes come from. The dashboard uses [`SourceFetcher`];
/// tests plug in their own.
pub trait Fetch {
    fn fetch(&self, source: &str) -> Result<Bytes, FetchError>;
}

/// Fetches `http(s)://` sources with a blocking HTTP client and reads
/// anything else from the local filesystem.
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    timeout: Duration,
}

impl SourceFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SourceFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

impl Fetch for SourceFetcher {
    fn fetch(&self, source: &str) -> Result<Bytes, FetchError> {
        if !is_remote(source) {
            return std::fs::read(source)
                .map(Bytes::from)
                .map_err(|e| FetchError::Io {
                    source_name: source.to_string(),
                    reason: e.to_string(),
                });
        }

        let network = |e: reqwest::Error| FetchError::Network {
            source_name: source.to_string(),
            reason: e.to_string(),
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(network)?;

        log::debug!("GET {source}");
        let resp = client.get(source).send().map_err(network)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: source.to_string(),
                status: status.as_u16(),
            });
        }
        resp.bytes().map_err(network)
    }
}

// ---------------------------------------------------------------------------
// Memoized loading
// ---------------------------------------------------------------------------

/// Process-lifetime cache of parsed datasets keyed by source.
///
/// There is no expiry and no invalidation: a source is fetched at most once
/// per successful load. Failed loads are not remembered, so a retry fetches
/// again.
pub struct DatasetCache<F: Fetch = SourceFetcher> {
    fetcher: F,
    entries: HashMap<String, Arc<SalaryDataset>>,
}

impl<F: Fetch> DatasetCache<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            entries: HashMap::new(),
        }
    }

    /// Return the cached dataset for `source`, loading it on first use.
    pub fn load(&mut self, source: &str) -> Result<Arc<SalaryDataset>, FetchError> {
        if let Some(ds) = self.entries.get(source) {
            log::debug!("dataset cache hit for {source}");
            return Ok(Arc::clone(ds));
        }

        log::info!("Fetching {source}");
        let dataset = Arc::new(load_with(&self.fetcher, source)?);
        log::info!(
            "Loaded {} records with columns {:?} from {source}",
            dataset.len(),
            dataset.columns
        );
        self.entries.insert(source.to_string(), Arc::clone(&dataset));
        Ok(dataset)
    }

    pub fn is_cached(&self, source: &str) -> bool {
        self.entries.contains_key(source)
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Tabular formats understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
    Parquet,
}

impl DataFormat {
    /// Dispatch by extension, ignoring any query string. Sources without an
    /// extension are read as CSV.
    pub fn from_source(source: &str) -> Result<Self, FetchError> {
        let path = source.split(['?', '#']).next().unwrap_or(source);
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let ext = match file_name.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return Ok(DataFormat::Csv),
        };

        match ext.as_str() {
            "csv" | "txt" => Ok(DataFormat::Csv),
            "json" => Ok(DataFormat::Json),
            "parquet" | "pq" => Ok(DataFormat::Parquet),
            other => Err(FetchError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Fetch and parse `source` without caching.
pub fn load_with(fetcher: &impl Fetch, source: &str) -> Result<SalaryDataset, FetchError> {
    let format = DataFormat::from_source(source)?;
    let bytes = fetcher.fetch(source)?;
    parse(format, bytes).map_err(|e| {
        log::error!("Failed to parse {source}: {e:#}");
        FetchError::Parse {
            source_name: source.to_string(),
            reason: format!("{e:#}"),
        }
    })
}

pub fn parse(format: DataFormat, bytes: Bytes) -> Result<SalaryDataset> {
    let dataset = match format {
        DataFormat::Csv => parse_csv(&bytes)?,
        DataFormat::Json => parse_json(&bytes)?,
        DataFormat::Parquet => parse_parquet(bytes)?,
    };
    if dataset.columns.is_empty() {
        bail!("no columns found");
    }
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Header row with column names, one record per line. Short rows are padded
/// with nulls.
pub fn parse_csv(bytes: &[u8]) -> Result<SalaryDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cells = (0..columns.len())
            .map(|i| record.get(i).map(CellValue::guess).unwrap_or(CellValue::Null))
            .collect();
        rows.push(cells);
    }

    Ok(SalaryDataset::from_rows(columns, rows))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`:
///
/// ```json
/// [
///   { "ano": 2025, "cargo": "Data Scientist", "usd": 120000 },
///   ...
/// ]
/// ```
///
/// Columns are the union of keys in first-seen order.
pub fn parse_json(bytes: &[u8]) -> Result<SalaryDataset> {
    let root: JsonValue = serde_json::from_slice(bytes).context("parsing JSON")?;
    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut objects = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let rows = objects
        .into_iter()
        .map(|obj| {
            columns
                .iter()
                .map(|c| obj.get(c).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    Ok(SalaryDataset::from_rows(columns, rows))
}

/// Strings follow the same rule as CSV text: trimmed, blank is null.
fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::guess(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Flat Parquet table as written by `df.to_parquet()` (Pandas) or
/// `df.write_parquet()` (Polars). Non-primitive columns are rendered to text.
pub fn parse_parquet(bytes: Bytes) -> Result<SalaryDataset> {
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(bytes).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|col| extract_cell(col, row))
                .collect();
            rows.push(cells);
        }
    }

    Ok(SalaryDataset::from_rows(columns, rows))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &ArrayRef, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let cell = match col.data_type() {
        DataType::Utf8 => col
            .as_string_opt::<i32>()
            .map(|a| CellValue::guess(a.value(row))),
        DataType::LargeUtf8 => col
            .as_string_opt::<i64>()
            .map(|a| CellValue::guess(a.value(row))),
        DataType::Int32 => col
            .as_primitive_opt::<Int32Type>()
            .map(|a| CellValue::Integer(a.value(row) as i64)),
        DataType::Int64 => col
            .as_primitive_opt::<Int64Type>()
            .map(|a| CellValue::Integer(a.value(row))),
        DataType::Float32 => col
            .as_primitive_opt::<Float32Type>()
            .map(|a| CellValue::Float(a.value(row) as f64)),
        DataType::Float64 => col
            .as_primitive_opt::<Float64Type>()
            .map(|a| CellValue::Float(a.value(row))),
        DataType::Boolean => col.as_boolean_opt().map(|a| CellValue::Bool(a.value(row))),
        _ => arrow::util::display::array_value_to_string(col.as_ref(), row)
            .ok()
            .map(|s| CellValue::guess(&s)),
    };
    cell.unwrap_or(CellValue::Null)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Write;

    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::{Field as ArrowField, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;
    use crate::data::model::Field;

    const SAMPLE: &str = "ano , cargo ,usd\n2024,Engenheiro,100000\nabc,Analista,\n,Data Scientist,90000\n";

    struct CountingFetcher {
        body: &'static str,
        calls: Cell<usize>,
    }

    impl Fetch for CountingFetcher {
        fn fetch(&self, _source: &str) -> Result<Bytes, FetchError> {
            self.calls.set(self.calls.get() + 1);
            Ok(Bytes::from_static(self.body.as_bytes()))
        }
    }

    struct FailingFetcher;

    impl Fetch for FailingFetcher {
        fn fetch(&self, source: &str) -> Result<Bytes, FetchError> {
            Err(FetchError::Network {
                source_name: source.to_string(),
                reason: "unreachable".into(),
            })
        }
    }

    #[test]
    fn csv_headers_trimmed_and_year_coerced() {
        let ds = parse_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(ds.columns, vec!["ano", "cargo", "usd"]);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.records[0].ano, Some(2024));
        assert_eq!(ds.records[1].ano, None);
        assert_eq!(ds.records[2].ano, None);
        assert_eq!(ds.records[1].usd, None);
        assert_eq!(ds.records[2].cargo_norm, "data scientist");
        assert!(ds.has(Field::Cargo));
    }

    #[test]
    fn cache_fetches_once_per_source() {
        let fetcher = CountingFetcher {
            body: SAMPLE,
            calls: Cell::new(0),
        };
        let mut cache = DatasetCache::new(fetcher);
        let a = cache.load("https://example.org/dados.csv").unwrap();
        let b = cache.load("https://example.org/dados.csv").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.fetcher.calls.get(), 1);

        cache.load("https://example.org/outro.csv").unwrap();
        assert_eq!(cache.fetcher.calls.get(), 2);
    }

    #[test]
    fn failed_load_is_not_cached() {
        let mut cache = DatasetCache::new(FailingFetcher);
        let err = cache.load("https://example.org/dados.csv").unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
        assert!(!cache.is_cached("https://example.org/dados.csv"));
    }

    #[test]
    fn unparseable_payload_is_fetch_error() {
        let fetcher = CountingFetcher {
            body: "not json",
            calls: Cell::new(0),
        };
        let err = load_with(&fetcher, "dados.json").unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));

        let empty = CountingFetcher {
            body: "",
            calls: Cell::new(0),
        };
        assert!(matches!(
            load_with(&empty, "dados.csv"),
            Err(FetchError::Parse { .. })
        ));
    }

    #[test]
    fn format_dispatch() {
        assert_eq!(
            DataFormat::from_source("https://host/a/dados.csv?raw=1").unwrap(),
            DataFormat::Csv
        );
        assert_eq!(DataFormat::from_source("dados.JSON").unwrap(), DataFormat::Json);
        assert_eq!(DataFormat::from_source("x/dados.pq").unwrap(), DataFormat::Parquet);
        assert_eq!(DataFormat::from_source("https://host/export").unwrap(), DataFormat::Csv);
        assert!(matches!(
            DataFormat::from_source("dados.xlsx"),
            Err(FetchError::UnsupportedFormat(ext)) if ext == "xlsx"
        ));
    }

    #[test]
    fn json_records_union_columns() {
        let text = r#"[{"ano": 2025, "cargo": "Data Scientist"}, {"usd": 10.5, "ano": "2024"}]"#;
        let ds = parse_json(text.as_bytes()).unwrap();
        assert_eq!(ds.columns.len(), 3);
        assert_eq!(ds.records[0].usd, None);
        assert_eq!(ds.records[1].ano, Some(2024));
        assert_eq!(ds.records[1].usd, Some(10.5));
    }

    #[test]
    fn text_cells_read_alike_from_csv_and_json() {
        let csv = parse_csv(b"senioridade,cargo,contrato
 senior ,  Data Scientist ,   
").unwrap();
        let json = parse_json(
            r#"[{"senioridade": " senior ", "cargo": "  Data Scientist ", "contrato": "   "}]"#.as_bytes(),
        )
        .unwrap();
        for ds in [&csv, &json] {
            let rec = &ds.records[0];
            assert_eq!(rec.senioridade.as_deref(), Some("senior"));
            assert_eq!(rec.cargo.as_deref(), Some("Data Scientist"));
            assert_eq!(rec.contrato, None);
            assert!(ds.observed.seniority.contains("senior"));
        }
    }

    #[test]
    fn parquet_round_trip_through_arrow_writer() {
        let schema = Arc::new(Schema::new(vec![
            ArrowField::new("ano", DataType::Int64, true),
            ArrowField::new("cargo", DataType::Utf8, true),
            ArrowField::new("usd", DataType::Float64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![Some(2025), None])),
                Arc::new(StringArray::from(vec![Some("Data Scientist"), None])),
                Arc::new(Float64Array::from(vec![Some(150000.0), Some(80000.0)])),
            ],
        )
        .unwrap();

        let mut buf = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buf, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = parse_parquet(Bytes::from(buf)).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[0].ano, Some(2025));
        assert_eq!(ds.records[1].ano, None);
        assert_eq!(ds.records[1].cargo_norm, "");
        assert_eq!(ds.records[1].usd, Some(80000.0));
    }

    #[test]
    fn local_files_are_read_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let mut cache = DatasetCache::new(SourceFetcher::default());
        let ds = cache.load(&path).unwrap();
        assert_eq!(ds.len(), 3);

        let missing = cache.load("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(missing, FetchError::Io { .. }));
    }
}
