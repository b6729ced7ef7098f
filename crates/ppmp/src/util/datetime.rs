//! ISO 8601 datetime parsing and formatting.
//!
//! PPMP timestamps are rendered as ISO 8601 strings with a UTC offset.
//! Strings without an offset are interpreted in the local timezone of the
//! process, as are naive datetimes handed to property setters.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeDelta, TimeZone,
    Utc,
};

/// Naive layouts accepted in addition to RFC 3339.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset layouts that RFC 3339 parsing rejects but ISO 8601 allows.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// The current time in the local timezone.
pub fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Tags a naive datetime with the local timezone.
///
/// Local times that fall into a DST gap are read as UTC wall-clock time
/// and converted; ambiguous ones take the earlier instant.
pub fn with_local_timezone(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    match Local.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.fixed_offset(),
        None => Local.from_utc_datetime(&naive).fixed_offset(),
    }
}

/// Parses an ISO 8601 datetime. Offset-naive input is tagged with the
/// local timezone; a bare date means midnight local time.
///
/// Returns `None` if the string is not a recognizable datetime.
pub fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(with_local_timezone(naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(with_local_timezone)
}

/// Formats a datetime as ISO 8601 with an explicit offset, e.g.
/// `2002-05-30T09:30:10.123+02:00`. Sub-second digits are emitted in
/// groups of three and omitted when zero.
pub fn format_datetime(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Whole milliseconds from `reference` to `ts`, negative if `ts` is earlier.
pub fn millis_between(reference: &DateTime<FixedOffset>, ts: &DateTime<FixedOffset>) -> i64 {
    ts.signed_duration_since(*reference).num_milliseconds()
}

/// Adds a millisecond offset to a reference timestamp.
///
/// Returns `None` if the result lies outside the representable range.
pub fn add_millis(
    reference: &DateTime<FixedOffset>,
    offset: i64,
) -> Option<DateTime<FixedOffset>> {
    reference.checked_add_signed(TimeDelta::try_milliseconds(offset)?)
}

/// Whether `offset` milliseconds can be added to the Unix epoch.
pub fn is_representable_offset(offset: i64) -> bool {
    add_millis(&DateTime::<Utc>::UNIX_EPOCH.fixed_offset(), offset).is_some()
}
