use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Column carrying the numeric FIPS state code.
pub const STATE_COLUMN: &str = "state";
/// Column carrying the district number (or an at-large marker).
pub const DISTRICT_COLUMN: &str = "congressional district";
pub const NAME_COLUMN: &str = "NAME";
/// Census `GEO_ID`, used when the state/district columns are absent.
pub const GEO_ID_COLUMN: &str = "GEO_ID";

/// `5001800US4832` → state `48`, district `32`. The two digits after `500`
/// are the Congress number.
static GEO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^500\d{2}00US(\d{2})(\w{2})$").expect("GEO_ID regex is valid"));

/// One row of raw counts for one congressional district and one year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// Numeric FIPS state code, as supplied.
    pub state_code: String,
    /// District number or at-large marker, as supplied.
    pub district_code: String,
    pub name: Option<String>,
    /// Raw variable name → count. Absent variables read as zero.
    pub counts: HashMap<String, u64>,
}

impl RawRecord {
    pub fn new(state_code: impl Into<String>, district_code: impl Into<String>) -> Self {
        Self {
            state_code: state_code.into(),
            district_code: district_code.into(),
            ..Default::default()
        }
    }

    /// Builder-style count setter.
    pub fn with_count(mut self, field: impl Into<String>, value: u64) -> Self {
        self.counts.insert(field.into(), value);
        self
    }

    /// Store a raw string value, parsed leniently (see [`parse_count`]).
    pub fn set_raw(&mut self, field: &str, raw: &str) {
        self.counts.insert(field.to_string(), parse_count(raw));
    }

    /// Count for `field`; zero when absent.
    pub fn count(&self, field: &str) -> u64 {
        self.counts.get(field).copied().unwrap_or(0)
    }

    /// Human-readable geographic identifier for diagnostics.
    pub fn geo_id(&self) -> String {
        format!("state={} district={}", self.state_code, self.district_code)
    }

    /// Build a record from a header row and one data row. Geography columns
    /// are picked out by name, everything else becomes a count.
    pub fn from_columns<'a, H, V>(headers: H, values: V) -> Self
    where
        H: IntoIterator<Item = &'a str>,
        V: IntoIterator<Item = &'a str>,
    {
        let mut rec = RawRecord::default();
        let mut geo_id = None;
        for (header, value) in headers.into_iter().zip(values) {
            match header.trim() {
                STATE_COLUMN => rec.state_code = clean_str(value),
                DISTRICT_COLUMN => rec.district_code = clean_str(value),
                NAME_COLUMN => rec.name = Some(clean_str(value)),
                GEO_ID_COLUMN => geo_id = Some(clean_str(value)),
                field => rec.set_raw(field, value),
            }
        }

        if rec.state_code.is_empty() && rec.district_code.is_empty() {
            if let Some(caps) = geo_id.as_deref().and_then(|g| GEO_ID_RE.captures(g)) {
                rec.state_code = caps[1].to_string();
                rec.district_code = caps[2].to_string();
            }
        }
        rec
    }
}

/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse a raw count. Never fails: missing, non-numeric, negative (Census
/// annotation sentinels like `-666666666`) and non-finite values are zero,
/// fractions are truncated.
pub fn parse_count(raw: &str) -> u64 {
    let cleaned = clean_str(raw);
    if let Ok(v) = cleaned.parse::<u64>() {
        return v;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v.trunc() as u64,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count_is_lenient() {
        assert_eq!(parse_count("1234"), 1234);
        assert_eq!(parse_count("  \"56\" "), 56);
        assert_eq!(parse_count("12.9"), 12);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("null"), 0);
        assert_eq!(parse_count("N/A"), 0);
        assert_eq!(parse_count("-666666666"), 0);
        assert_eq!(parse_count("NaN"), 0);
        assert_eq!(parse_count("inf"), 0);
    }

    #[test]
    fn test_missing_field_reads_zero() {
        let rec = RawRecord::new("48", "32").with_count("B01001_007E", 10);
        assert_eq!(rec.count("B01001_007E"), 10);
        assert_eq!(rec.count("B01001_008E"), 0);
    }

    #[test]
    fn test_from_columns() {
        let headers = ["NAME", "B01001_007E", "B01001_008E", "state", "congressional district"];
        let values = [
            "Congressional District 32 (118th Congress), Texas",
            "1000",
            "oops",
            "48",
            "32",
        ];
        let rec = RawRecord::from_columns(headers, values);
        assert_eq!(rec.state_code, "48");
        assert_eq!(rec.district_code, "32");
        assert_eq!(rec.count("B01001_007E"), 1000);
        assert_eq!(rec.count("B01001_008E"), 0);
        assert!(rec.name.unwrap().contains("Texas"));
        assert!(!rec.counts.contains_key("state"));
    }

    #[test]
    fn test_from_columns_falls_back_to_geo_id() {
        let rec = RawRecord::from_columns(["GEO_ID", "B03002_003E"], ["5001800US0600", "7"]);
        assert_eq!(rec.state_code, "06");
        assert_eq!(rec.district_code, "00");
        assert_eq!(rec.count("B03002_003E"), 7);

        let bad = RawRecord::from_columns(["GEO_ID"], ["0400000US06"]);
        assert!(bad.state_code.is_empty());
    }
}
