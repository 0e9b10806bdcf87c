//! Validation of `startDate` / `endDate` and the range bounds derived from them.

use chrono::{Days, NaiveDate, NaiveDateTime};

use crate::error::{Result, SearchError};

const DAY_FORMAT: &str = "%Y-%m-%d";

// `%.f` also matches an absent fraction, so these cover the four
// with/without fraction, with/without `Z` variants.
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedDate {
    /// A bare calendar day, `YYYY-MM-DD`.
    Day(NaiveDate),
    /// A full timestamp; the client's text is kept as sent.
    Timestamp(String),
}

pub fn parse_date(value: &str) -> Result<ParsedDate> {
    if let Ok(day) = NaiveDate::parse_from_str(value, DAY_FORMAT) {
        return Ok(ParsedDate::Day(day));
    }
    for format in TIMESTAMP_FORMATS {
        if NaiveDateTime::parse_from_str(value, format).is_ok() {
            return Ok(ParsedDate::Timestamp(value.to_string()));
        }
    }
    Err(SearchError::client("Invalid date format"))
}

/// One side of a range predicate on a record time field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateBound {
    AtLeast(String),
    AtMost(String),
    Before(String),
}

impl DateBound {
    pub fn operator(&self) -> &'static str {
        match self {
            DateBound::AtLeast(_) => "gte",
            DateBound::AtMost(_) => "lte",
            DateBound::Before(_) => "lt",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            DateBound::AtLeast(v) | DateBound::AtMost(v) | DateBound::Before(v) => v,
        }
    }
}

/// Lower bound for `startDate`, applied to the record end time.
pub fn start_bound(start_date: &str) -> Result<DateBound> {
    parse_date(start_date)?;
    Ok(DateBound::AtLeast(start_date.to_string()))
}

/// Upper bound for `endDate`, applied to the record start time. A bare day
/// includes the whole day by bounding strictly before the next one.
pub fn end_bound(end_date: &str) -> Result<DateBound> {
    match parse_date(end_date)? {
        ParsedDate::Day(day) => {
            let next_day = day
                .checked_add_days(Days::new(1))
                .ok_or_else(|| SearchError::client("Invalid date format"))?;
            Ok(DateBound::Before(next_day.format(DAY_FORMAT).to_string()))
        }
        ParsedDate::Timestamp(timestamp) => Ok(DateBound::AtMost(timestamp)),
    }
}
