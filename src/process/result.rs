use serde::Serialize;

use crate::schema::DimensionCounts;

/// A geography left out of a build, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDistrict {
    pub geo_id: String,
    pub cause: String,
}

/// Summary of one build invocation. A response artifact, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    pub year: u16,
    pub spec_version: String,
    pub districts_processed: usize,
    pub districts_skipped: usize,
    pub cells_generated: usize,
    pub skipped: Vec<SkippedDistrict>,
    pub dimensions: DimensionCounts,
}
