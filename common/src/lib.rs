//! Common library exports shared between the search backend and its callers.

extern crate serde;


pub mod search_const;
pub mod search_context;
pub mod pagination;
pub mod search_result;
