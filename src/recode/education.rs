use crate::process::raw_table::RawRecord;
use crate::schema::{Education, RecodeSpec};

use super::{sum_buckets, Distribution};

/// Educational attainment (population 25+) from B15003, collapsed into the
/// five canonical bands.
pub fn recode_education(spec: &RecodeSpec, record: &RawRecord) -> Distribution<Education> {
    sum_buckets(record, spec.education)
}
