//! Duration and timestamp formatting.
//!
//! Timestamps cross every boundary of the system as naive local clock
//! values in `YYYY-MM-DD HH:MM:SS` form. No timezone conversion happens here.

use chrono::{Local, NaiveDateTime, Timelike};

use crate::queue::{QueueError, QueueResult};

/// Textual timestamp format shared with storage and API clients
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;

/// Format a non-negative number of seconds as a compact display string.
///
/// Uses the two largest applicable units:
///
/// ```
/// use conseater::time_format::format_duration;
///
/// assert_eq!(format_duration(3725.0), "1h 2m");
/// assert_eq!(format_duration(3000.0), "50m");
/// assert_eq!(format_duration(7200.0), "2h");
/// assert_eq!(format_duration(42.9), "42s");
/// ```
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };

    let hours = total / SECONDS_PER_HOUR;
    let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let secs = total % SECONDS_PER_MINUTE;

    if hours > 0 {
        if minutes > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{hours}h")
        }
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{secs}s")
    }
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp.
///
/// # Errors
///
/// Returns [`QueueError::InvalidTimestamp`] for anything else; the input is
/// never coerced.
pub fn parse_timestamp(value: &str) -> QueueResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|source| {
        QueueError::InvalidTimestamp {
            value: value.to_string(),
            source,
        }
    })
}

/// Format a timestamp as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Current local wall-clock time, truncated to whole seconds.
pub fn local_now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Serde adapter for [`NaiveDateTime`] fields in `YYYY-MM-DD HH:MM:SS` form.
pub mod naive_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }

    /// Same as the parent module for `Option<NaiveDateTime>`.
    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(v) => serializer.serialize_str(&super::super::format_timestamp(v)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw: Option<String> = Option::deserialize(deserializer)?;
            raw.map(|s| super::super::parse_timestamp(&s))
                .transpose()
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(0.0), "0s");
        assert_eq!(format_duration(59.99), "59s");
        assert_eq!(format_duration(60.0), "1m");
        assert_eq!(format_duration(3000.0), "50m");
        assert_eq!(format_duration(3599.0), "59m");
        assert_eq!(format_duration(3600.0), "1h");
        assert_eq!(format_duration(3725.0), "1h 2m");
        assert_eq!(format_duration(6600.0), "1h 50m");
        assert_eq!(format_duration(26.0 * 3600.0 + 60.0), "26h 1m");
    }

    #[test]
    fn test_format_duration_degenerate_input() {
        assert_eq!(format_duration(-5.0), "0s");
        assert_eq!(format_duration(f64::NAN), "0s");
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = parse_timestamp("2024-01-01 10:00:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-01 10:00:00");
    }

    #[test]
    fn test_local_now_has_whole_seconds() {
        assert_eq!(local_now().nanosecond(), 0);
    }

    #[test]
    fn test_malformed_timestamp_rejected() {
        for bad in ["2024-01-01T10:00:00", "2024-01-01", "10:00:00", "", "2024-13-01 10:00:00"] {
            let err = parse_timestamp(bad).unwrap_err();
            assert!(
                matches!(err, QueueError::InvalidTimestamp { ref value, .. } if value == bad),
                "expected parse error for {bad:?}"
            );
        }
    }
}
