// src/process/mod.rs
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};
use tracing::{debug, warn};

pub mod cell;
pub mod crosstab;
pub mod raw_table;
pub mod result;

pub use cell::{CellKey, DemographicCell};
pub use crosstab::{allocate, Build, CrossTabBuilder};
pub use raw_table::RawRecord;
pub use result::{BuildResult, SkippedDistrict};

/// Open `path` and read one `RawRecord` per data row.
///
/// The header row names the columns: `state`, `congressional district`,
/// optionally `NAME`/`GEO_ID`, and one column per raw variable.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_raw_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>> {
    let file = File::open(&path)
        .with_context(|| format!("Failed to open raw CSV: {:?}", path.as_ref()))?;
    read_raw_csv(BufReader::new(file))
        .with_context(|| format!("Failed to read raw CSV: {:?}", path.as_ref()))
}

/// Parse raw records from any CSV reader. Short rows read their missing
/// trailing fields as zero.
pub fn read_raw_csv<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("reading CSV header row")?.clone();
    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let row = result.with_context(|| format!("CSV parse error at record {}", idx))?;
        if row.iter().all(|f| f.is_empty()) {
            warn!(idx, "skipping blank row");
            continue;
        }
        records.push(RawRecord::from_columns(headers.iter(), row.iter()));
    }
    debug!(rows = records.len(), columns = headers.len(), "read raw CSV");
    Ok(records)
}
