//! Cell encoding for progress records
//!
//! Each record is one row under its [`ProgressKey`] with two cells in the
//! `data` family:
//!
//! ```text
//! user_1#VIDEO#title_1#media_1
//! └── data
//!     ├── milliseconds = "1000"        (version 0)
//!     └── event_at     = "1700000000"  (version 0)
//! ```
//!
//! Integers are stored as decimal ASCII, not fixed-width binary.

use widecolumn::{Mutation, Row, RowFilter};

use crate::domain::{MediaProgress, ProgressKey};
use crate::error::DecodeError;

/// Column family holding every progress cell
pub const FAMILY: &str = "data";

/// Column holding the playback offset
pub const COLUMN_MILLISECONDS: &str = "milliseconds";

/// Column holding the event timestamp
pub const COLUMN_EVENT_AT: &str = "event_at";

/// Every write uses this fixed cell version
pub const CELL_VERSION: i64 = 0;

/// Exclusive upper bound of the stale-write guard range
pub const GUARD_RANGE_END: &[u8] = b"99999999999999999";

pub fn encode_i64(value: i64) -> Vec<u8> {
    value.to_string().into_bytes()
}

pub fn decode_i64(column: &str, bytes: &[u8]) -> Result<i64, DecodeError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| DecodeError::InvalidInteger {
            column: column.to_string(),
            value: String::from_utf8_lossy(bytes).into_owned(),
        })
}

/// Mutation setting both cells of a record
pub fn encode_mutation(progress: &MediaProgress) -> Mutation {
    let mut mutation = Mutation::new();
    mutation.set(
        FAMILY,
        COLUMN_MILLISECONDS,
        CELL_VERSION,
        encode_i64(progress.milliseconds_played),
    );
    mutation.set(FAMILY, COLUMN_EVENT_AT, CELL_VERSION, encode_i64(progress.event_at));
    mutation
}

/// Decode a stored row back into a record
///
/// The newest version of each column wins; unknown columns are ignored.
pub fn decode_row(row: &Row) -> Result<MediaProgress, DecodeError> {
    let key = ProgressKey::parse(&row.key)?;
    let column = |qualifier: &str| -> Result<i64, DecodeError> {
        let cell = row
            .latest(FAMILY, qualifier)
            .ok_or_else(|| DecodeError::MissingCell(format!("{}:{}", FAMILY, qualifier)))?;
        decode_i64(qualifier, &cell.value)
    };

    let milliseconds_played = column(COLUMN_MILLISECONDS)?;
    let event_at = column(COLUMN_EVENT_AT)?;
    Ok(MediaProgress::from_key(key, milliseconds_played, event_at))
}

/// Predicate matching a row whose `event_at` is at or after `start`
///
/// The comparison is bytewise over the decimal text, as the store evaluates it.
pub fn event_at_since(start: i64) -> RowFilter {
    RowFilter::chain([
        RowFilter::Family(FAMILY.to_string()),
        RowFilter::Column(COLUMN_EVENT_AT.to_string()),
        RowFilter::ValueRange {
            start: encode_i64(start),
            end: GUARD_RANGE_END.to_vec(),
        },
    ])
}
