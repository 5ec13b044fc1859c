pub mod arrow;
pub mod dims;
pub mod geo;
pub mod recode;
pub mod tables;

pub use arrow::cell_schema;
pub use dims::{AgeGroup, CensusRegion, Dimension, Education, RaceEth, Sex};
pub use recode::{DimensionCounts, RecodeSpec, RECODE_SPEC};
