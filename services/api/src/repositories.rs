//! Repositories for database operations
//!
//! Every list query returns denormalized view rows (author name and avatar,
//! counters, per-caller flags) so handlers never issue follow-up queries per
//! row.

use common::error::DatabaseError;
use std::str::FromStr;

pub mod case_study;
pub mod quest;

/// Parse a text column into a domain enum, reporting bad values as corruption
pub(crate) fn parse_column<T>(table: &'static str, value: &str) -> Result<T, DatabaseError>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|detail| DatabaseError::Corrupt { table, detail })
}
