use crate::process::raw_table::RawRecord;
use crate::schema::{AgeGroup, RecodeSpec, Sex};

use super::{sum_buckets, Distribution};

/// Age distribution for one sex: each of the six adult age groups mapped to
/// the sum of its fine-grained B01001 buckets.
pub fn recode_age(spec: &RecodeSpec, record: &RawRecord, sex: Sex) -> Distribution<AgeGroup> {
    sum_buckets(record, spec.age_buckets(sex))
}
