//! Wire timestamp conversions.
//!
//! SOSS RPC timestamps are `YYYYMMDDHHMMSS.mmm` strings in Hawaii Standard
//! Time, which has no daylight saving; the 10-hour UTC offset is therefore a
//! fixed constant ([`HST_UTC_OFFSET_SECS`]), applied here rather than taken
//! from the ambient system zone so encode and decode agree on any host.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::core::constants::{HST_UTC_OFFSET_SECS, TIMESTAMP_LEN};
use crate::core::ProtocolError;

const WIRE_FORMAT: &str = "%Y%m%d%H%M%S";

fn hst() -> FixedOffset {
    FixedOffset::east_opt(HST_UTC_OFFSET_SECS).expect("HST offset is in range")
}

/// Encode a UTC epoch value (seconds) as a wire timestamp.
///
/// Milliseconds are rounded to three digits.
pub fn encode(epoch_secs: f64) -> Result<String, ProtocolError> {
    let millis = (epoch_secs * 1000.0).round() as i64;
    let utc = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| ProtocolError::BadTimestamp(format!("epoch {epoch_secs} out of range")))?;
    let local = utc.with_timezone(&hst());
    Ok(format!(
        "{}.{:03}",
        local.format(WIRE_FORMAT),
        local.timestamp_subsec_millis()
    ))
}

/// The current instant as a wire timestamp.
pub fn now() -> String {
    let local = Utc::now().with_timezone(&hst());
    format!(
        "{}.{:03}",
        local.format(WIRE_FORMAT),
        local.timestamp_subsec_millis()
    )
}

/// Decode a wire timestamp into a UTC epoch value (seconds).
///
/// The wire value is HST local time, so the fixed 10-hour offset is applied.
pub fn decode(timestamp: &str) -> Result<f64, ProtocolError> {
    let bad = || ProtocolError::BadTimestamp(timestamp.to_owned());

    if timestamp.len() != TIMESTAMP_LEN {
        return Err(bad());
    }
    let (head, tail) = timestamp.split_once('.').ok_or_else(bad)?;

    let naive = NaiveDateTime::parse_from_str(head, WIRE_FORMAT).map_err(|_| bad())?;
    if tail.len() != 3 || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let frac: f64 = format!("0.{tail}").parse().map_err(|_| bad())?;

    let local = naive
        .and_local_timezone(hst())
        .single()
        .ok_or_else(bad)?;
    Ok(local.timestamp() as f64 + frac)
}
