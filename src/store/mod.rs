pub mod cells;
pub mod stats;
pub mod table;

pub use cells::CellStore;
pub use stats::{summarize, YearStats};
pub use table::{InsertSummary, PartitionedTable, TableRow};
