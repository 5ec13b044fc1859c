use crate::process::raw_table::RawRecord;
use crate::schema::{RaceEth, RecodeSpec};

use super::{sum_buckets, Distribution};

/// Race/ethnicity distribution from B03002. Hispanic origin is read from its
/// own field and the race fields are all non-Hispanic, so the five labels
/// are disjoint.
pub fn recode_race(spec: &RecodeSpec, record: &RawRecord) -> Distribution<RaceEth> {
    sum_buckets(record, spec.race_eth)
}
