// src/schema/tables.rs
//
// Fine-grained ACS 5-year variables → canonical labels. These are explicit
// key lists so they can be audited line by line against the model's recode
// sheet. Do not derive them arithmetically.

use super::dims::{AgeGroup, Education, RaceEth};

/// One canonical label and the raw fields summed into it.
pub type Buckets<D> = &'static [(D, &'static [&'static str])];

/// B01001 (sex by age), male block. `_003E`..`_006E` (under 18) are unused.
pub const MALE_AGE: Buckets<AgeGroup> = &[
    (
        AgeGroup::A18To24,
        &["B01001_007E", "B01001_008E", "B01001_009E", "B01001_010E"],
    ),
    (AgeGroup::A25To34, &["B01001_011E", "B01001_012E"]),
    (AgeGroup::A35To44, &["B01001_013E", "B01001_014E"]),
    (AgeGroup::A45To54, &["B01001_015E", "B01001_016E"]),
    (
        AgeGroup::A55To64,
        &["B01001_017E", "B01001_018E", "B01001_019E"],
    ),
    (
        AgeGroup::A65Plus,
        &[
            "B01001_020E",
            "B01001_021E",
            "B01001_022E",
            "B01001_023E",
            "B01001_024E",
            "B01001_025E",
        ],
    ),
];

/// B01001 (sex by age), female block. `_027E`..`_030E` (under 18) are unused.
pub const FEMALE_AGE: Buckets<AgeGroup> = &[
    (
        AgeGroup::A18To24,
        &["B01001_031E", "B01001_032E", "B01001_033E", "B01001_034E"],
    ),
    (AgeGroup::A25To34, &["B01001_035E", "B01001_036E"]),
    (AgeGroup::A35To44, &["B01001_037E", "B01001_038E"]),
    (AgeGroup::A45To54, &["B01001_039E", "B01001_040E"]),
    (
        AgeGroup::A55To64,
        &["B01001_041E", "B01001_042E", "B01001_043E"],
    ),
    (
        AgeGroup::A65Plus,
        &[
            "B01001_044E",
            "B01001_045E",
            "B01001_046E",
            "B01001_047E",
            "B01001_048E",
            "B01001_049E",
        ],
    ),
];

/// B03002 (Hispanic or Latino origin by race). Every race field is the
/// "not Hispanic or Latino" variant; Hispanic comes from `_012E` alone.
pub const RACE_ETH: Buckets<RaceEth> = &[
    (RaceEth::White, &["B03002_003E"]),
    (RaceEth::Black, &["B03002_004E"]),
    (RaceEth::Hispanic, &["B03002_012E"]),
    (RaceEth::Asian, &["B03002_006E"]),
    // AIAN, NHPI, some other race, two or more races
    (
        RaceEth::Other,
        &["B03002_005E", "B03002_007E", "B03002_008E", "B03002_009E"],
    ),
];

/// B15003 (educational attainment, population 25+). Contiguous ranges.
pub const EDUCATION: Buckets<Education> = &[
    (
        Education::NoHighSchool,
        &[
            "B15003_002E",
            "B15003_003E",
            "B15003_004E",
            "B15003_005E",
            "B15003_006E",
            "B15003_007E",
            "B15003_008E",
            "B15003_009E",
            "B15003_010E",
            "B15003_011E",
            "B15003_012E",
            "B15003_013E",
            "B15003_014E",
            "B15003_015E",
            "B15003_016E",
        ],
    ),
    (Education::HighSchool, &["B15003_017E", "B15003_018E"]),
    (
        Education::SomeCollege,
        &["B15003_019E", "B15003_020E", "B15003_021E"],
    ),
    (Education::Bachelors, &["B15003_022E"]),
    (
        Education::PostGrad,
        &["B15003_023E", "B15003_024E", "B15003_025E"],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::dims::Dimension;
    use std::collections::HashSet;

    fn fields<D: 'static>(table: Buckets<D>) -> Vec<&'static str> {
        table.iter().flat_map(|(_, f)| f.iter().copied()).collect()
    }

    fn labels<D: Dimension>(table: Buckets<D>) -> Vec<D> {
        table.iter().map(|(d, _)| *d).collect()
    }

    #[test]
    fn test_tables_cover_every_label_once() {
        assert_eq!(labels(MALE_AGE), AgeGroup::ALL.to_vec());
        assert_eq!(labels(FEMALE_AGE), AgeGroup::ALL.to_vec());
        assert_eq!(labels(EDUCATION), Education::ALL.to_vec());
        let race: HashSet<_> = labels(RACE_ETH).into_iter().collect();
        assert_eq!(race.len(), RaceEth::ALL.len());
    }

    #[test]
    fn test_no_field_is_used_twice() {
        let mut all = fields(MALE_AGE);
        all.extend(fields(FEMALE_AGE));
        all.extend(fields(RACE_ETH));
        all.extend(fields(EDUCATION));
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_age_blocks_are_contiguous_and_offset() {
        let male = fields(MALE_AGE);
        let female = fields(FEMALE_AGE);
        assert_eq!(male.len(), 19);
        assert_eq!(female.len(), 19);
        for (i, (m, f)) in male.iter().zip(&female).enumerate() {
            assert_eq!(*m, format!("B01001_{:03}E", 7 + i));
            assert_eq!(*f, format!("B01001_{:03}E", 31 + i));
        }
    }

    #[test]
    fn test_education_is_contiguous_2_through_25() {
        let edu = fields(EDUCATION);
        let expected: Vec<String> = (2..=25).map(|n| format!("B15003_{:03}E", n)).collect();
        assert_eq!(edu, expected);
    }

    #[test]
    fn test_race_excludes_hispanic_subtotals() {
        let race = fields(RACE_ETH);
        // _002E is the not-Hispanic total, _013E.. are Hispanic-by-race
        assert!(!race.contains(&"B03002_002E"));
        assert!(!race.contains(&"B03002_013E"));
        assert_eq!(race.len(), 8);
    }
}
