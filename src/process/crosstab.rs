// src/process/crosstab.rs
//
// Proportional-independence allocation: the source only publishes marginal
// distributions, so each cell is the age-specific base multiplied by the
// three marginal proportions. Per-cell rounding means cell sums need not
// reconcile exactly with the marginal totals; that is accepted.

use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use crate::error::BuildError;
use crate::process::cell::DemographicCell;
use crate::process::raw_table::RawRecord;
use crate::process::result::{BuildResult, SkippedDistrict};
use crate::recode::{
    recode_age, recode_education, recode_race, resolve_geography, total, Distribution, Geography,
};
use crate::schema::{Dimension, Education, RaceEth, RecodeSpec, Sex};

/// Cells plus the accounting for one build.
#[derive(Debug, Clone)]
pub struct Build {
    pub cells: Vec<DemographicCell>,
    pub result: BuildResult,
}

/// Estimated population of one cell, rounded half away from zero.
///
/// `base × (age / age_total) × (race / race_total) × (edu / edu_total)`,
/// multiplied left to right. Callers guarantee every total is non-zero.
pub fn allocate(
    base: u64,
    (age, age_total): (u64, u64),
    (race, race_total): (u64, u64),
    (edu, edu_total): (u64, u64),
) -> u64 {
    let estimate = base as f64
        * (age as f64 / age_total as f64)
        * (race as f64 / race_total as f64)
        * (edu as f64 / edu_total as f64);
    estimate.round() as u64
}

/// Turns raw geography records for one year into demographic cells.
pub struct CrossTabBuilder<'a> {
    spec: &'a RecodeSpec,
}

impl<'a> CrossTabBuilder<'a> {
    pub fn new(spec: &'a RecodeSpec) -> Self {
        Self { spec }
    }

    /// Build the full cell set for `year`.
    ///
    /// Geographies that cannot be identified, or repeat one already seen,
    /// are skipped with their cause; they never fail the build. Only an
    /// empty input does.
    #[instrument(level = "info", skip(self, records), fields(records = records.len()))]
    pub fn build(&self, year: u16, records: &[RawRecord]) -> Result<Build, BuildError> {
        if records.is_empty() {
            return Err(BuildError::EmptyInput { year });
        }

        // 1) resolve identities in input order; first occurrence wins
        let mut seen: HashSet<(&'static str, String)> = HashSet::new();
        let mut accepted: Vec<(Geography, &RawRecord)> = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        for record in records {
            match resolve_geography(self.spec, record) {
                Ok(geo) => {
                    if seen.insert((geo.state, geo.district.clone())) {
                        accepted.push((geo, record));
                    } else {
                        warn!(district = %geo.district, "duplicate geography skipped");
                        skipped.push(SkippedDistrict {
                            geo_id: record.geo_id(),
                            cause: format!("duplicate geography {}", geo.district),
                        });
                    }
                }
                Err(e) => {
                    warn!(geo_id = %record.geo_id(), error = %e, "geography skipped");
                    skipped.push(SkippedDistrict {
                        geo_id: record.geo_id(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        // 2) geographies are independent; collect keeps input order
        let per_geo: Vec<Vec<DemographicCell>> = accepted
            .par_iter()
            .map(|(geo, record)| self.geography_cells(year, geo, record))
            .collect();
        let cells: Vec<DemographicCell> = per_geo.into_iter().flatten().collect();

        let result = BuildResult {
            year,
            spec_version: self.spec.version.to_string(),
            districts_processed: accepted.len(),
            districts_skipped: skipped.len(),
            cells_generated: cells.len(),
            skipped,
            dimensions: self.spec.dimensions(),
        };
        info!(
            processed = result.districts_processed,
            skipped = result.districts_skipped,
            cells = result.cells_generated,
            "build complete"
        );
        Ok(Build { cells, result })
    }

    /// Every non-zero cell for one resolved geography.
    pub fn geography_cells(
        &self,
        year: u16,
        geo: &Geography,
        record: &RawRecord,
    ) -> Vec<DemographicCell> {
        let race = recode_race(self.spec, record);
        let education = recode_education(self.spec, record);

        let mut cells = Vec::new();
        for sex in Sex::ALL {
            self.sex_cells(year, geo, record, *sex, &race, &education, &mut cells);
        }
        cells
    }

    #[allow(clippy::too_many_arguments)]
    fn sex_cells(
        &self,
        year: u16,
        geo: &Geography,
        record: &RawRecord,
        sex: Sex,
        race: &Distribution<RaceEth>,
        education: &Distribution<Education>,
        out: &mut Vec<DemographicCell>,
    ) {
        let age = recode_age(self.spec, record, sex);
        let (age_total, race_total, edu_total) = (total(&age), total(race), total(education));

        // a zero marginal means missing source data, not zero population
        if age_total == 0 || race_total == 0 || edu_total == 0 {
            debug!(
                district = %geo.district,
                sex = %sex,
                age_total,
                race_total,
                edu_total,
                "zero marginal; no cells"
            );
            return;
        }

        for (age_group, age_count) in &age {
            for (race_eth, race_count) in race {
                for (edu, edu_count) in education {
                    let population = allocate(
                        age_total,
                        (*age_count, age_total),
                        (*race_count, race_total),
                        (*edu_count, edu_total),
                    );
                    if population == 0 {
                        continue;
                    }
                    out.push(DemographicCell {
                        year,
                        state: geo.state.to_string(),
                        district: geo.district.clone(),
                        age_group: *age_group,
                        sex,
                        race_eth: *race_eth,
                        education: *edu,
                        census_region: geo.region,
                        population,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AgeGroup, CensusRegion, RECODE_SPEC};

    fn tx32() -> RawRecord {
        RawRecord::new("48", "32")
            .with_count("B01001_007E", 1000)
            .with_count("B03002_003E", 2000)
            .with_count("B15003_022E", 1500)
    }

    /// Every category of every dimension has the same count, both sexes.
    /// Only the first raw field of each label carries the count.
    fn uniform(state: &str, district: &str, n: u64) -> RawRecord {
        let mut rec = RawRecord::new(state, district);
        for (_, fields) in RECODE_SPEC.male_age.iter().chain(RECODE_SPEC.female_age) {
            rec = rec.with_count(fields[0], n);
        }
        for (_, fields) in RECODE_SPEC.race_eth {
            rec = rec.with_count(fields[0], n);
        }
        for (_, fields) in RECODE_SPEC.education {
            rec = rec.with_count(fields[0], n);
        }
        rec
    }

    #[test]
    fn test_tx32_example() {
        let build = CrossTabBuilder::new(&RECODE_SPEC)
            .build(2022, &[tx32()])
            .unwrap();
        assert_eq!(build.cells.len(), 1);
        let cell = &build.cells[0];
        assert_eq!(cell.district, "TX-32");
        assert_eq!(cell.state, "TX");
        assert_eq!(cell.sex, Sex::Male);
        assert_eq!(cell.age_group, AgeGroup::A18To24);
        assert_eq!(cell.race_eth, RaceEth::White);
        assert_eq!(cell.education, Education::Bachelors);
        assert_eq!(cell.census_region, CensusRegion::South);
        assert_eq!(cell.population, 1000);

        assert_eq!(build.result.districts_processed, 1);
        assert_eq!(build.result.districts_skipped, 0);
        assert_eq!(build.result.cells_generated, 1);
    }

    #[test]
    fn test_zero_marginal_emits_nothing_for_that_slice() {
        // no education data at all
        let rec = RawRecord::new("48", "32")
            .with_count("B01001_007E", 1000)
            .with_count("B01001_031E", 1000)
            .with_count("B03002_003E", 2000);
        let build = CrossTabBuilder::new(&RECODE_SPEC).build(2022, &[rec]).unwrap();
        assert!(build.cells.is_empty());
        assert_eq!(build.result.districts_processed, 1);
    }

    #[test]
    fn test_uniform_marginals_give_equal_cells() {
        let rec = uniform("36", "10", 600);
        let build = CrossTabBuilder::new(&RECODE_SPEC).build(2020, &[rec]).unwrap();
        // 2 sexes × 6 ages × 5 races × 5 education
        assert_eq!(build.cells.len(), 300);
        // 3600 × 1/6 × 1/5 × 1/5 = 24
        assert!(build.cells.iter().all(|c| c.population == 24));
    }

    #[test]
    fn test_bad_geography_is_skipped_not_fatal() {
        let bad = RawRecord::new("99", "01").with_count("B01001_007E", 10);
        let build = CrossTabBuilder::new(&RECODE_SPEC)
            .build(2022, &[bad, tx32()])
            .unwrap();
        assert_eq!(build.result.districts_processed, 1);
        assert_eq!(build.result.districts_skipped, 1);
        assert_eq!(build.result.skipped[0].geo_id, "state=99 district=01");
        assert!(build.result.skipped[0].cause.contains("unknown state code"));
        assert_eq!(build.cells.len(), 1);
    }

    #[test]
    fn test_duplicate_geography_is_skipped() {
        let build = CrossTabBuilder::new(&RECODE_SPEC)
            .build(2022, &[tx32(), tx32()])
            .unwrap();
        assert_eq!(build.result.districts_processed, 1);
        assert_eq!(build.result.districts_skipped, 1);
        assert!(build.result.skipped[0].cause.contains("duplicate"));
    }

    #[test]
    fn test_empty_input_fails() {
        let err = CrossTabBuilder::new(&RECODE_SPEC).build(2022, &[]).unwrap_err();
        assert_eq!(err, BuildError::EmptyInput { year: 2022 });
    }

    #[test]
    fn test_keys_unique_and_populations_positive() {
        let records: Vec<RawRecord> = (1..=5)
            .map(|d| {
                uniform("06", &d.to_string(), 100 + d)
                    .with_count("B15003_025E", 3)
                    .with_count("B03002_009E", 1)
            })
            .collect();
        let build = CrossTabBuilder::new(&RECODE_SPEC).build(2022, &records).unwrap();
        let keys: HashSet<_> = build.cells.iter().map(|c| c.key()).collect();
        assert_eq!(keys.len(), build.cells.len());
        assert!(build.cells.iter().all(|c| c.population > 0));
    }

    #[test]
    fn test_output_is_deterministic() {
        let records: Vec<RawRecord> = (1..=20)
            .map(|d| uniform("48", &d.to_string(), 97 * d).with_count("B01001_025E", 13 * d))
            .collect();
        let builder = CrossTabBuilder::new(&RECODE_SPEC);
        let a = serde_json::to_vec(&builder.build(2022, &records).unwrap().cells).unwrap();
        let b = serde_json::to_vec(&builder.build(2022, &records).unwrap().cells).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_allocate_rounds_half_away_from_zero() {
        // 10 × 1/4 = 2.5 → 3
        assert_eq!(allocate(10, (1, 4), (1, 1), (1, 1)), 3);
        // 10 × 1/8 = 1.25 → 1
        assert_eq!(allocate(10, (1, 8), (1, 1), (1, 1)), 1);
        // 3 × 1/3 × 1/2 × 1/2 = 0.25 → 0
        assert_eq!(allocate(3, (1, 3), (1, 2), (1, 2)), 0);
    }
}
