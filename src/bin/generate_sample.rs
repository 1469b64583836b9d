//! Writes a synthetic salary table to `sample_salarios.csv` and
//! `sample_salarios.parquet` so the dashboard can run offline:
//!
//! ```text
//! cargo run --bin generate_sample
//! echo '{ "data_url": "sample_salarios.csv" }' > salary-dashboard.json
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// (title, base salary in USD)
const TITLES: [(&str, f64); 8] = [
    ("Data Scientist", 120_000.0),
    ("Data Engineer", 125_000.0),
    ("Data Analyst", 85_000.0),
    ("Machine Learning Engineer", 150_000.0),
    ("Analytics Engineer", 110_000.0),
    ("Research Scientist", 140_000.0),
    ("Data Architect", 145_000.0),
    ("Business Intelligence Analyst", 80_000.0),
];

/// (seniority, multiplier)
const LEVELS: [(&str, f64); 4] = [
    ("junior", 0.6),
    ("pleno", 0.85),
    ("senior", 1.1),
    ("executivo", 1.5),
];

const CONTRACTS: [&str; 4] = ["integral", "parcial", "contrato", "freelancer"];
const SIZES: [&str; 3] = ["pequena", "media", "grande"];
const MODES: [&str; 3] = ["remoto", "hibrido", "presencial"];
const COUNTRIES: [&str; 8] = ["USA", "GBR", "CAN", "DEU", "BRA", "IND", "ESP", "FRA"];

struct Row {
    ano: i64,
    senioridade: &'static str,
    contrato: &'static str,
    cargo: &'static str,
    usd: f64,
    remoto: &'static str,
    residencia_iso3: &'static str,
    tamanho_empresa: &'static str,
}

fn generate_rows(n: usize, rng: &mut SimpleRng) -> Vec<Row> {
    (0..n)
        .map(|_| {
            let ano = 2020 + (rng.next_u64() % 6) as i64;
            let (cargo, base) = TITLES[(rng.next_u64() % TITLES.len() as u64) as usize];
            let (senioridade, mult) = LEVELS[(rng.next_u64() % LEVELS.len() as u64) as usize];
            // Salaries drift up about 4% a year.
            let growth = 1.04f64.powi((ano - 2020) as i32);
            let usd = rng.gauss(base * mult * growth, base * 0.12).max(15_000.0).round();
            Row {
                ano,
                senioridade,
                contrato: rng.pick(&CONTRACTS),
                cargo,
                usd,
                remoto: rng.pick(&MODES),
                residencia_iso3: rng.pick(&COUNTRIES),
                tamanho_empresa: rng.pick(&SIZES),
            }
        })
        .collect()
}

const HEADER: [&str; 8] = [
    "ano",
    "senioridade",
    "contrato",
    "cargo",
    "usd",
    "remoto",
    "residencia_iso3",
    "tamanho_empresa",
];

fn write_csv(path: &str, rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(HEADER)?;
    for r in rows {
        writer.write_record([
            r.ano.to_string(),
            r.senioridade.to_string(),
            r.contrato.to_string(),
            r.cargo.to_string(),
            format!("{:.0}", r.usd),
            r.remoto.to_string(),
            r.residencia_iso3.to_string(),
            r.tamanho_empresa.to_string(),
        ])?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(path: &str, rows: &[Row]) -> Result<()> {
    let text = |f: fn(&Row) -> &'static str| -> StringArray { rows.iter().map(|r| Some(f(r))).collect() };

    let schema = Arc::new(Schema::new(
        HEADER
            .iter()
            .map(|name| match *name {
                "ano" => Field::new(*name, DataType::Int64, true),
                "usd" => Field::new(*name, DataType::Float64, true),
                _ => Field::new(*name, DataType::Utf8, true),
            })
            .collect::<Vec<_>>(),
    ));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.ano))),
            Arc::new(text(|r| r.senioridade)),
            Arc::new(text(|r| r.contrato)),
            Arc::new(text(|r| r.cargo)),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.usd))),
            Arc::new(text(|r| r.remoto)),
            Arc::new(text(|r| r.residencia_iso3)),
            Arc::new(text(|r| r.tamanho_empresa)),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate_rows(2_000, &mut rng);

    write_csv("sample_salarios.csv", &rows)?;
    write_parquet("sample_salarios.parquet", &rows)?;

    println!(
        "Wrote {} records to sample_salarios.csv and sample_salarios.parquet",
        rows.len()
    );
    Ok(())
}
