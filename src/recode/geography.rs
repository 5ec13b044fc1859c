use serde::Serialize;

use crate::error::RecodeError;
use crate::process::raw_table::RawRecord;
use crate::schema::{CensusRegion, RecodeSpec};

/// Resolved identity of one geography.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Geography {
    pub state: &'static str,
    /// `ST-NN`, e.g. `TX-32`, `AK-00`, `DC-98`.
    pub district: String,
    pub region: CensusRegion,
}

/// Region containing `state`. Linear scan over the region table; a miss is
/// an input-validation failure, never a default.
pub fn get_region(spec: &RecodeSpec, state: &str) -> Result<CensusRegion, RecodeError> {
    spec.regions
        .iter()
        .find(|(_, states)| states.contains(&state))
        .map(|(region, _)| *region)
        .ok_or_else(|| RecodeError::UnknownGeography(state.to_string()))
}

/// Convert the record's numeric state code and district code into a state
/// abbreviation and a `ST-NN` district label.
///
/// At-large (`00`) and delegate (`98`) districts keep their code; the
/// textual markers `at-large`/`AL` normalise to `00`.
pub fn parse_district(
    spec: &RecodeSpec,
    record: &RawRecord,
) -> Result<(&'static str, String), RecodeError> {
    let state_code = record.state_code.trim();
    let state = Some(state_code)
        .filter(|c| !c.is_empty() && c.chars().all(|ch| ch.is_ascii_digit()))
        .and_then(|c| c.parse::<u8>().ok())
        .and_then(|n| spec.state_for_fips(&format!("{:02}", n)))
        .ok_or_else(|| RecodeError::UnknownStateCode(state_code.to_string()))?;

    let district = normalise_district_code(&record.district_code)
        .ok_or_else(|| RecodeError::InvalidDistrictCode(record.district_code.clone()))?;

    Ok((state, format!("{}-{}", state, district)))
}

/// State, district label and region in one step.
pub fn resolve_geography(spec: &RecodeSpec, record: &RawRecord) -> Result<Geography, RecodeError> {
    let (state, district) = parse_district(spec, record)?;
    let region = get_region(spec, state)?;
    Ok(Geography {
        state,
        district,
        region,
    })
}

fn normalise_district_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    match code.to_ascii_lowercase().as_str() {
        "at-large" | "at large" | "al" => return Some("00".to_string()),
        _ => {}
    }
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match code.parse::<u16>() {
        Ok(n) if n <= 99 => Some(format!("{:02}", n)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::geo::STATE_FIPS;
    use crate::schema::RECODE_SPEC;

    #[test]
    fn test_parse_district_pads_number() {
        let rec = RawRecord::new("48", "32");
        assert_eq!(
            parse_district(&RECODE_SPEC, &rec).unwrap(),
            ("TX", "TX-32".to_string())
        );
        let rec = RawRecord::new("6", "7");
        assert_eq!(parse_district(&RECODE_SPEC, &rec).unwrap().1, "CA-07");
    }

    #[test]
    fn test_at_large_keeps_distinguished_code() {
        let rec = RawRecord::new("02", "00");
        assert_eq!(parse_district(&RECODE_SPEC, &rec).unwrap().1, "AK-00");
        let rec = RawRecord::new("11", "98");
        assert_eq!(parse_district(&RECODE_SPEC, &rec).unwrap().1, "DC-98");
        let rec = RawRecord::new("50", "At-Large");
        assert_eq!(parse_district(&RECODE_SPEC, &rec).unwrap().1, "VT-00");
    }

    #[test]
    fn test_unknown_state_code_is_an_error() {
        let rec = RawRecord::new("03", "01");
        assert_eq!(
            parse_district(&RECODE_SPEC, &rec),
            Err(RecodeError::UnknownStateCode("03".into()))
        );
        let rec = RawRecord::new("+48", "32");
        assert_eq!(
            parse_district(&RECODE_SPEC, &rec),
            Err(RecodeError::UnknownStateCode("+48".into()))
        );
        let rec = RawRecord::new("TX", "01");
        assert!(matches!(
            parse_district(&RECODE_SPEC, &rec),
            Err(RecodeError::UnknownStateCode(_))
        ));
    }

    #[test]
    fn test_bad_district_code_is_an_error() {
        for code in ["ZZ", "", "100", "-1"] {
            let rec = RawRecord::new("48", code);
            assert_eq!(
                parse_district(&RECODE_SPEC, &rec),
                Err(RecodeError::InvalidDistrictCode(code.into()))
            );
        }
    }

    #[test]
    fn test_every_known_state_has_exactly_one_region() {
        for (_, state) in STATE_FIPS {
            let hits = RECODE_SPEC
                .regions
                .iter()
                .filter(|(_, states)| states.contains(state))
                .count();
            assert_eq!(hits, 1, "{} should be in exactly one region", state);
            assert!(get_region(&RECODE_SPEC, state).is_ok());
        }
        assert_eq!(STATE_FIPS.len(), 56);
    }

    #[test]
    fn test_region_lookup() {
        assert_eq!(get_region(&RECODE_SPEC, "TX"), Ok(CensusRegion::South));
        assert_eq!(get_region(&RECODE_SPEC, "DC"), Ok(CensusRegion::South));
        assert_eq!(get_region(&RECODE_SPEC, "PR"), Ok(CensusRegion::Territories));
        assert_eq!(
            get_region(&RECODE_SPEC, "XX"),
            Err(RecodeError::UnknownGeography("XX".into()))
        );
    }

    #[test]
    fn test_resolve_geography() {
        let geo = resolve_geography(&RECODE_SPEC, &RawRecord::new("36", "14")).unwrap();
        assert_eq!(geo.state, "NY");
        assert_eq!(geo.district, "NY-14");
        assert_eq!(geo.region, CensusRegion::Northeast);
    }
}
