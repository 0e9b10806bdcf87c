//! Paging defaults and limits for catalogue searches.

/// Number of records returned when `maximumRecords` is absent or unparseable.
pub const COUNT_DEFAULT: i64 = 10;

/// Largest page a client may ask for; bigger values are clamped.
pub const COUNT_MAX: i64 = 50;

pub const START_INDEX_DEFAULT: i64 = 1;
pub const START_PAGE_DEFAULT: i64 = 1;

/// The search engine refuses to page past this many hits.
pub const MAX_RESULT_WINDOW: i64 = 10_000;
