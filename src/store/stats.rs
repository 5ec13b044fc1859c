use serde::Serialize;
use std::collections::HashSet;

use crate::process::DemographicCell;

/// Aggregate statistics for one year of cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearStats {
    pub year: u16,
    pub cell_count: usize,
    pub district_count: usize,
    pub total_population: u64,
}

pub fn summarize(year: u16, cells: &[DemographicCell]) -> YearStats {
    let districts: HashSet<&str> = cells
        .iter()
        .filter(|c| c.year == year)
        .map(|c| c.district.as_str())
        .collect();
    let in_year = cells.iter().filter(|c| c.year == year);
    YearStats {
        year,
        cell_count: in_year.clone().count(),
        district_count: districts.len(),
        total_population: in_year.map(|c| c.population).sum(),
    }
}
