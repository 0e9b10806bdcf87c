//! Query translation and execution against the catalogue index.

pub mod dates;
pub mod geometry;
pub mod query_builder;

mod search_for_results;
pub use search_for_results::SearchService;
