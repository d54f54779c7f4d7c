//! Rate table row parsing.
//!
//! Turns one delimited row into a validated [`RateRecord`](crate::types::RateRecord).
//! Malformed rows are never errors: they are dropped by returning `None`.

mod fields;
mod row;

pub use fields::{clean_text, parse_date, parse_decimal, split_row};
pub use row::{parse_row, Column, ColumnMap, ParsedRow};
