// src/schema/recode.rs

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::dims::{AgeGroup, CensusRegion, Dimension, Education, RaceEth, Sex};
use super::geo::{REGION_STATES, STATE_FIPS};
use super::tables::{Buckets, EDUCATION, FEMALE_AGE, MALE_AGE, RACE_ETH};

/// The process-wide recode specification.
pub static RECODE_SPEC: Lazy<RecodeSpec> = Lazy::new(RecodeSpec::acs5);

/// Immutable description of every canonical dimension: bucket tables, the
/// FIPS table and the state → region mapping. Built once, read everywhere.
#[derive(Debug)]
pub struct RecodeSpec {
    pub version: &'static str,
    pub male_age: Buckets<AgeGroup>,
    pub female_age: Buckets<AgeGroup>,
    pub race_eth: Buckets<RaceEth>,
    pub education: Buckets<Education>,
    pub regions: &'static [(CensusRegion, &'static [&'static str])],
    state_by_fips: HashMap<&'static str, &'static str>,
}

/// Number of categories per dimension, for client self-description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionCounts {
    pub age_groups: usize,
    pub sexes: usize,
    pub race_eth: usize,
    pub education: usize,
    pub census_regions: usize,
}

impl RecodeSpec {
    /// ACS 5-year, congressional-district recode.
    pub fn acs5() -> Self {
        Self {
            version: "acs5-cd-v1",
            male_age: MALE_AGE,
            female_age: FEMALE_AGE,
            race_eth: RACE_ETH,
            education: EDUCATION,
            regions: REGION_STATES,
            state_by_fips: STATE_FIPS.iter().copied().collect(),
        }
    }

    pub fn age_buckets(&self, sex: Sex) -> Buckets<AgeGroup> {
        match sex {
            Sex::Male => self.male_age,
            Sex::Female => self.female_age,
        }
    }

    /// Abbreviation for a two-digit FIPS code.
    pub fn state_for_fips(&self, fips: &str) -> Option<&'static str> {
        self.state_by_fips.get(fips).copied()
    }

    pub fn dimensions(&self) -> DimensionCounts {
        DimensionCounts {
            age_groups: AgeGroup::ALL.len(),
            sexes: Sex::ALL.len(),
            race_eth: RaceEth::ALL.len(),
            education: Education::ALL.len(),
            census_regions: CensusRegion::ALL.len(),
        }
    }

    /// Every raw field any table reads, sorted and de-duplicated.
    pub fn raw_fields(&self) -> Vec<&'static str> {
        let mut set = BTreeSet::new();
        for (_, fields) in self.male_age.iter().chain(self.female_age.iter()) {
            set.extend(fields.iter().copied());
        }
        for (_, fields) in self.race_eth {
            set.extend(fields.iter().copied());
        }
        for (_, fields) in self.education {
            set.extend(fields.iter().copied());
        }
        set.into_iter().collect()
    }

    /// Check the geographic tables are consistent: every FIPS state sits in
    /// exactly one region and every region member has a FIPS code.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashMap<&str, CensusRegion> = HashMap::new();
        for (region, states) in self.regions {
            for state in *states {
                if let Some(prev) = seen.insert(*state, *region) {
                    bail!("state {} is in both {} and {}", state, prev, region);
                }
            }
        }
        for (fips, state) in self.state_by_fips.iter() {
            if !seen.contains_key(state) {
                bail!("state {} (FIPS {}) has no census region", state, fips);
            }
        }
        let known: BTreeSet<&str> = self.state_by_fips.values().copied().collect();
        for state in seen.keys() {
            if !known.contains(state) {
                bail!("region member {} has no FIPS code", state);
            }
        }
        Ok(())
    }
}
