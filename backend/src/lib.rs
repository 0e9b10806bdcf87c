//! Catalogue search backend: query translation, search-engine access,
//! result rendering and the HTTP surface.

pub mod api;
pub mod config;
pub mod db_utils;
pub mod error;
pub mod render;
pub mod server;
