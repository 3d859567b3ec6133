//! Conversion between wire timestamps and domain time.
//!
//! Both envelope variants carry instants as an integer count of microseconds
//! since the Unix epoch, interpreted in UTC. The pair is exact at
//! microsecond resolution over the whole range `DateTime<Utc>` can hold.

use chrono::{DateTime, Utc};

use crate::{Error, Result};

/// Converts epoch microseconds into a UTC instant.
///
/// Fails only for values outside the range chrono can represent.
pub fn decode_micros(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros).ok_or(Error::InvalidTimestamp { micros })
}

/// Converts a UTC instant back into epoch microseconds.
///
/// Sub-microsecond precision is discarded, which never happens for values
/// produced by [`decode_micros`].
pub fn encode_micros(time: &DateTime<Utc>) -> i64 {
    time.timestamp_micros()
}
