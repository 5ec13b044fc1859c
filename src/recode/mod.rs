//! Recode engine: pure functions from one raw geography record to
//! per-dimension category counts, plus geography resolution.
//!
//! Two failure policies live here and must not be conflated: a missing or
//! malformed count field reads as zero, a geography that cannot be
//! identified is an error.

pub mod age;
pub mod education;
pub mod geography;
pub mod race;

pub use age::recode_age;
pub use education::recode_education;
pub use geography::{get_region, parse_district, resolve_geography, Geography};
pub use race::recode_race;

use std::collections::BTreeMap;

use crate::process::raw_table::RawRecord;
use crate::schema::tables::Buckets;
use crate::schema::Dimension;

/// Canonical label → count. Ordered by canonical label order.
pub type Distribution<D> = BTreeMap<D, u64>;

/// Sum of every count in a distribution.
pub fn total<D>(dist: &Distribution<D>) -> u64 {
    dist.values().sum()
}

/// Sum each label's raw fields. Every label appears in the result, even
/// when its count is zero.
pub(crate) fn sum_buckets<D: Dimension>(record: &RawRecord, table: Buckets<D>) -> Distribution<D> {
    table
        .iter()
        .map(|(label, fields)| {
            let count = fields
                .iter()
                .fold(0u64, |acc, f| acc.saturating_add(record.count(f)));
            (*label, count)
        })
        .collect()
}
