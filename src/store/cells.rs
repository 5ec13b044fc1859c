use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, StringArray, UInt16Array, UInt64Array},
    datatypes::Schema as ArrowSchema,
    record_batch::RecordBatch,
};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, instrument, warn};

use crate::process::DemographicCell;
use crate::schema::{cell_schema, AgeGroup, CensusRegion, Dimension, Education, RaceEth, Sex};
use crate::store::stats::{summarize, YearStats};
use crate::store::table::{InsertSummary, PartitionedTable, TableRow};

const CELLS_TABLE: &str = "cells";

fn year_partition(year: u16) -> String {
    format!("year={}", year)
}

impl TableRow for DemographicCell {
    fn schema() -> Arc<ArrowSchema> {
        cell_schema()
    }

    fn partition(&self) -> String {
        year_partition(self.year)
    }

    fn unique_key(&self) -> String {
        self.key().as_string()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        fn labels<D: Dimension>(
            rows: &[DemographicCell],
            get: impl Fn(&DemographicCell) -> D,
        ) -> ArrayRef {
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| get(r).label()),
            ))
        }

        let columns: Vec<ArrayRef> = vec![
            Arc::new(UInt16Array::from_iter_values(rows.iter().map(|r| r.year))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.state.as_str()))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.district.as_str()))),
            labels(rows, |r| r.age_group),
            labels(rows, |r| r.sex),
            labels(rows, |r| r.race_eth),
            labels(rows, |r| r.education),
            labels(rows, |r| r.census_region),
            Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.population))),
        ];
        RecordBatch::try_new(cell_schema(), columns).context("building cells RecordBatch")
    }

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let year = column::<UInt16Array>(batch, "year")?;
        let state = column::<StringArray>(batch, "state")?;
        let district = column::<StringArray>(batch, "district")?;
        let age_group = column::<StringArray>(batch, "age_group")?;
        let sex = column::<StringArray>(batch, "sex")?;
        let race_eth = column::<StringArray>(batch, "race_eth")?;
        let education = column::<StringArray>(batch, "education")?;
        let census_region = column::<StringArray>(batch, "census_region")?;
        let population = column::<UInt64Array>(batch, "population")?;

        (0..batch.num_rows())
            .map(|i| -> Result<DemographicCell> {
                Ok(DemographicCell {
                    year: year.value(i),
                    state: state.value(i).to_string(),
                    district: district.value(i).to_string(),
                    age_group: label::<AgeGroup>(age_group.value(i))?,
                    sex: label::<Sex>(sex.value(i))?,
                    race_eth: label::<RaceEth>(race_eth.value(i))?,
                    education: label::<Education>(education.value(i))?,
                    census_region: label::<CensusRegion>(census_region.value(i))?,
                    population: population.value(i),
                })
            })
            .collect()
    }
}

fn column<'b, A: Array + 'static>(batch: &'b RecordBatch, name: &str) -> Result<&'b A> {
    batch
        .column_by_name(name)
        .ok_or_else(|| anyhow!("cells file is missing column `{}`", name))?
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| anyhow!("cells column `{}` has an unexpected type", name))
}

fn label<D: Dimension>(value: &str) -> Result<D> {
    D::from_label(value).ok_or_else(|| anyhow!("unknown {} label `{}`", D::NAME, value))
}

/// Year-partitioned store of demographic cells.
///
/// Inserts skip rows whose identity key is already stored, so a repeated
/// build never duplicates a cell; replacing a year means `delete_year`
/// first.
pub struct CellStore {
    table: PartitionedTable<DemographicCell>,
}

impl CellStore {
    pub fn open(base_dir: impl Into<PathBuf>, batch_size: usize) -> Result<Self> {
        Ok(Self {
            table: PartitionedTable::new(base_dir, CELLS_TABLE, batch_size)?,
        })
    }

    #[instrument(level = "info", skip(self, cells), fields(cells = cells.len()))]
    pub fn insert_cells(&self, cells: &[DemographicCell]) -> Result<InsertSummary> {
        let summary = self.table.insert(cells)?;
        info!(
            inserted = summary.inserted,
            duplicates = summary.duplicates,
            "stored cells"
        );
        Ok(summary)
    }

    /// Store a freshly built year. A year that is already stored is refused
    /// unless `replace` is set, in which case it is deleted first.
    pub fn store_year(
        &self,
        year: u16,
        cells: &[DemographicCell],
        replace: bool,
    ) -> Result<InsertSummary> {
        if self.has_year(year)? {
            if !replace {
                bail!("year {} is already stored; pass --replace to rebuild it", year);
            }
            let removed = self.delete_year(year)?;
            warn!(year, removed, "replacing stored year");
        }
        self.insert_cells(cells)
    }

    /// Remove every cell for `year`. Returns how many were removed.
    pub fn delete_year(&self, year: u16) -> Result<usize> {
        self.table.delete_partition(&year_partition(year))
    }

    pub fn has_year(&self, year: u16) -> Result<bool> {
        Ok(self.table.partitions()?.contains(&year_partition(year)))
    }

    pub fn contains(&self, cell: &DemographicCell) -> Result<bool> {
        self.table.contains(&cell.partition(), &cell.unique_key())
    }

    pub fn cells_for_year(&self, year: u16) -> Result<Vec<DemographicCell>> {
        self.table.read_partition(&year_partition(year))
    }

    pub fn cells_for_district(&self, year: u16, district: &str) -> Result<Vec<DemographicCell>> {
        Ok(self
            .cells_for_year(year)?
            .into_iter()
            .filter(|c| c.district == district)
            .collect())
    }

    pub fn year_stats(&self, year: u16) -> Result<YearStats> {
        Ok(summarize(year, &self.cells_for_year(year)?))
    }

    /// Years with stored cells, ascending.
    pub fn years(&self) -> Result<Vec<u16>> {
        Ok(self
            .table
            .partitions()?
            .iter()
            .filter_map(|p| p.strip_prefix("year=").and_then(|y| y.parse().ok()))
            .collect())
    }

    pub fn vacuum(&self) -> Result<()> {
        self.table.vacuum()
    }
}
