// Path: crates/types/src/time.rs

//! A fixed-precision UTC timestamp with a stable wire representation.
//!
//! Chrono's default serde representation varies its sub-second precision with
//! the value, which would make a signed entry's canonical form unstable under
//! a parse/serialize round trip. `Timestamp` always renders exactly three
//! fractional digits (`2026-01-05T12:00:00.000Z`), so the canonical bytes of
//! any structure embedding one survive round trips unchanged.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An instant in UTC, serialized as ISO-8601 with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current instant, truncated to millisecond precision.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Builds a timestamp from a chrono `DateTime`, truncating to milliseconds.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let millis = dt.timestamp_millis();
        // timestamp_millis_opt is total for any value produced by timestamp_millis.
        match Utc.timestamp_millis_opt(millis).single() {
            Some(truncated) => Self(truncated),
            None => Self(dt),
        }
    }

    /// Builds a timestamp from milliseconds since the Unix epoch.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Milliseconds since the Unix epoch.
    pub fn unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// The underlying chrono value.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Whether this instant is strictly before `other`.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dt = DateTime::parse_from_rfc3339(s)?;
        Ok(Self::from_datetime(dt.with_timezone(&Utc)))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_fixed_precision() {
        let ts = Timestamp::from_unix_millis(1_700_000_000_000).unwrap();
        assert_eq!(ts.to_string(), "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn round_trips_through_string() {
        let ts = Timestamp::now();
        let parsed: Timestamp = ts.to_string().parse().unwrap();
        assert_eq!(ts, parsed);
        assert_eq!(ts.to_string(), parsed.to_string());
    }

    #[test]
    fn serde_round_trip_is_stable() {
        let ts = Timestamp::from_unix_millis(1_700_000_000_123).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2023-11-14T22:13:20.123Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, back);
    }
}
