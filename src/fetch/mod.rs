//! Census API source: fetches one raw record per congressional district.
//!
//! The API limits fields per request, so variables are requested in chunks
//! and the partial responses are merged on the geographic key.

pub mod census;
pub mod urls;

pub use census::{merge_by_geography, parse_response, ApiTable, CensusClient};
pub use urls::{build_query_url, chunk_variables, required_variables};
