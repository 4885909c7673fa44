//! Parsing and storage formats for transaction timestamps.

use rusqlite::{Row, types::Type};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::Error;

/// Fixed width UTC format used in the database, e.g. "2024-12-01T00:00:00.000000Z".
///
/// Every stored value has the same width and offset, so ordering the text
/// column orders the timestamps.
const STORAGE_FORMAT: &[BorrowedFormatItem] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
);

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Parse an ISO-8601 timestamp sent by a client.
///
/// Accepts RFC 3339 date-times with any offset and bare dates, which are read
/// as midnight UTC. The result is always in UTC, and date-times that fall
/// outside the supported years once converted to UTC are rejected.
pub fn parse_client_date_time(text: &str) -> Option<OffsetDateTime> {
    if let Ok(date_time) = OffsetDateTime::parse(text, &Rfc3339) {
        return date_time.checked_to_offset(UtcOffset::UTC);
    }

    Date::parse(text, DATE_FORMAT)
        .ok()
        .map(|date| PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
}

/// Format `date_time` for storage, converting it to UTC.
///
/// # Errors
/// Returns [Error::TimeFormat] if the UTC date-time is out of range or its
/// year cannot be written with four digits.
pub fn to_storage_string(date_time: OffsetDateTime) -> Result<String, Error> {
    date_time
        .checked_to_offset(UtcOffset::UTC)
        .ok_or_else(|| Error::TimeFormat(format!("{date_time} is out of range in UTC")))?
        .format(STORAGE_FORMAT)
        .map_err(|error| Error::TimeFormat(error.to_string()))
}

/// Parse a timestamp written by [to_storage_string].
pub fn from_storage_string(text: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(text, STORAGE_FORMAT).map(PrimitiveDateTime::assume_utc)
}

/// Read a column written by [to_storage_string].
pub fn get_date_time_column(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let text: String = row.get(index)?;

    from_storage_string(&text).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

/// The current time truncated to the precision kept in the database.
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();

    now.replace_microsecond(now.microsecond()).unwrap_or(now)
}
