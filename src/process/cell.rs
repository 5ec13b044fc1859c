use serde::{Deserialize, Serialize};

use crate::schema::{AgeGroup, CensusRegion, Dimension, Education, RaceEth, Sex};

/// One poststratification cell: the estimated population of a single
/// (age, sex, race, education) combination in one district and year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicCell {
    pub year: u16,
    pub state: String,
    pub district: String,
    pub age_group: AgeGroup,
    pub sex: Sex,
    pub race_eth: RaceEth,
    pub education: Education,
    pub census_region: CensusRegion,
    pub population: u64,
}

/// Identity of a cell: every attribute except the population.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellKey {
    pub year: u16,
    pub state: String,
    pub district: String,
    pub age_group: AgeGroup,
    pub sex: Sex,
    pub race_eth: RaceEth,
    pub education: Education,
    pub census_region: CensusRegion,
}

impl DemographicCell {
    pub fn key(&self) -> CellKey {
        CellKey {
            year: self.year,
            state: self.state.clone(),
            district: self.district.clone(),
            age_group: self.age_group,
            sex: self.sex,
            race_eth: self.race_eth,
            education: self.education,
            census_region: self.census_region,
        }
    }
}

impl CellKey {
    /// Stable string form, used as the store's dedupe key.
    pub fn as_string(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}",
            self.year,
            self.state,
            self.district,
            self.age_group.label(),
            self.sex.label(),
            self.race_eth.label(),
            self.education.label(),
            self.census_region.label()
        )
    }
}
