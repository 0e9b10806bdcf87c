//! Page arithmetic over the 1-based OpenSearch record index.

use serde::{Deserialize, Serialize};

use crate::search_const::{COUNT_DEFAULT, START_PAGE_DEFAULT};
use crate::search_context::{SearchContext, SearchParam};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub count: i64,
    pub start_index: Option<i64>,
    pub start_page: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            count: COUNT_DEFAULT,
            start_index: None,
            start_page: START_PAGE_DEFAULT,
        }
    }
}

impl Pagination {
    /// Read the paging parameters; anything that does not parse as an
    /// integer falls back to its default.
    pub fn from_context(context: &SearchContext) -> Self {
        let parse = |param: SearchParam| context.get(param).and_then(|v: &str| v.trim().parse::<i64>().ok());
        Self {
            count: parse(SearchParam::MaximumRecords).unwrap_or(COUNT_DEFAULT),
            start_index: parse(SearchParam::StartRecord),
            start_page: parse(SearchParam::StartPage).unwrap_or(START_PAGE_DEFAULT),
        }
    }

    /// 1-based index of the first record of the page. Saturates at the
    /// `i64` range.
    pub fn first_index(&self) -> i64 {
        match self.start_index {
            Some(index) => index,
            None => self.start_page.saturating_sub(1).saturating_mul(self.count).saturating_add(1),
        }
    }

    /// 0-based offset of the first record of the page.
    pub fn offset(&self) -> i64 {
        self.first_index().saturating_sub(1)
    }
}
