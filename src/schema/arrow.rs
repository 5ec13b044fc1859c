// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use std::sync::Arc;

/// Column names of a persisted demographic cell, in storage order.
pub const CELL_COLUMNS: &[&str] = &[
    "year",
    "state",
    "district",
    "age_group",
    "sex",
    "race_eth",
    "education",
    "census_region",
    "population",
];

/// Map a cell column to its Arrow type.
///
/// - year       → UInt16
/// - population → UInt64
/// - labels     → Utf8
pub fn cell_column_type(name: &str) -> DataType {
    match name {
        "year" => DataType::UInt16,
        "population" => DataType::UInt64,
        _ => DataType::Utf8,
    }
}

/// Build the ArrowSchema (inside an Arc) for the cells table.
///
/// Every column is non-nullable: a cell with a missing attribute is never
/// produced, and readers reject files that disagree.
pub fn cell_schema() -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = CELL_COLUMNS
        .iter()
        .map(|name| ArrowField::new(*name, cell_column_type(name), /* nullable = */ false))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_schema_shape() {
        let schema = cell_schema();
        assert_eq!(schema.fields().len(), 9);
        assert_eq!(schema.field(0).name(), "year");
        assert_eq!(schema.field(8).data_type(), &DataType::UInt64);
        assert!(schema.fields().iter().all(|f| !f.is_nullable()));
    }
}
