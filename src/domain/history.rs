use chrono::{DateTime, Local, NaiveDateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::MinorUnits;

/// Storage format of `history.time`: UTC, microsecond precision, no offset suffix.
/// Lexical order of this format is chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Smallest step between two history timestamps of the same account.
pub fn timestamp_resolution() -> TimeDelta {
    TimeDelta::microseconds(1)
}

/// One immutable entry of the append-only `history` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub time: DateTime<Utc>,
    pub account: String,
    pub amount: MinorUnits,
    /// Serialized [`ZoneStamp`], kept as an audit artifact only.
    pub zone: Vec<u8>,
}

/// One row of the `localhistory` view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHistoryRow {
    pub localtime: String,
    pub account: String,
    pub amount: MinorUnits,
}

pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored `history.time`. Besides [`TIMESTAMP_FORMAT`], accepts a
/// trailing UTC offset (`2024-03-09 17:04:05.123456+00:00`) as written by
/// older stores.
pub fn parse_timestamp(raw: &str) -> chrono::ParseResult<DateTime<Utc>> {
    DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z")
        .map(|time| time.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|naive| naive.and_utc())
        })
}

/// The local offset in effect when an entry was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneStamp {
    pub utc_offset_seconds: i32,
    /// Offset rendered as `+HH:MM`.
    pub utc_offset: String,
}

impl ZoneStamp {
    pub fn of(local: &DateTime<Local>) -> Self {
        let offset = local.offset();
        Self {
            utc_offset_seconds: offset.local_minus_utc(),
            utc_offset: local.format("%:z").to_string(),
        }
    }

    pub fn to_blob(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Capture the current instant in UTC, truncated to microseconds, together
/// with the local zone descriptor at that instant.
pub fn capture_now() -> (DateTime<Utc>, ZoneStamp) {
    let now = Utc::now().trunc_subsecs(6);
    let local = now.with_timezone(&Local);
    (now, ZoneStamp::of(&local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_timestamp_roundtrip_keeps_microseconds() {
        let time = Utc
            .with_ymd_and_hms(2024, 3, 9, 17, 4, 5)
            .unwrap()
            .checked_add_signed(TimeDelta::microseconds(123_456))
            .unwrap();
        let raw = format_timestamp(time);
        assert_eq!(raw, "2024-03-09 17:04:05.123456");
        assert_eq!(parse_timestamp(&raw).unwrap(), time);
    }

    #[test]
    fn test_parse_timestamp_accepts_utc_offset_suffix() {
        let expected = Utc
            .with_ymd_and_hms(2024, 3, 9, 17, 4, 5)
            .unwrap()
            .checked_add_signed(TimeDelta::microseconds(123_456))
            .unwrap();
        assert_eq!(
            parse_timestamp("2024-03-09 17:04:05.123456+00:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_timestamp("2024-03-09 19:04:05.123456+02:00").unwrap(),
            expected
        );
        assert_eq!(
            parse_timestamp("2024-03-09 17:04:05+00:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).unwrap()
        );
        assert!(parse_timestamp("2024-03-09 17:04:05.1+00:00 junk").is_err());
    }

    #[test]
    fn test_timestamp_text_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let late = early + timestamp_resolution();
        assert!(format_timestamp(early) < format_timestamp(late));
    }

    #[test]
    fn test_capture_now_has_microsecond_precision() {
        let (now, zone) = capture_now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000, 0);
        assert_eq!(zone.utc_offset.len(), "+00:00".len());
    }

    #[test]
    fn test_zone_stamp_blob_carries_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = Utc
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .unwrap()
            .with_timezone(&offset);
        let stamp = ZoneStamp {
            utc_offset_seconds: local.offset().local_minus_utc(),
            utc_offset: local.format("%:z").to_string(),
        };
        assert_eq!(stamp.utc_offset, "+02:00");

        let blob = stamp.to_blob().unwrap();
        let decoded: ZoneStamp = serde_json::from_slice(&blob).unwrap();
        assert_eq!(decoded, stamp);
        assert_eq!(decoded.utc_offset_seconds, 7200);
    }
}
