//! Timestamp parsing for backend dates.
//!
//! The backend serializes Java `LocalDateTime` values without an offset
//! (`2024-05-01T08:30:00`), sometimes with fractional seconds, and sometimes
//! as plain dates. Offset-less values are local Vietnam time.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

/// Vietnam's UTC offset (no daylight saving).
pub const VN_OFFSET_SECS: i32 = 7 * 3600;

/// The fixed `+07:00` offset.
#[must_use]
pub fn vn_offset() -> FixedOffset {
    FixedOffset::east_opt(VN_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parse a backend timestamp.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    vn_offset()
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `dd/mm/yyyy` in Vietnam time.
#[must_use]
pub fn format_date_vn(at: DateTime<Utc>) -> String {
    at.with_timezone(&vn_offset()).format("%d/%m/%Y").to_string()
}

/// `dd/mm/yyyy HH:MM` in Vietnam time.
#[must_use]
pub fn format_datetime_vn(at: DateTime<Utc>) -> String {
    at.with_timezone(&vn_offset())
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

/// Serde adapter for optional timestamps. Unparseable values become `None`.
pub mod opt_timestamp {
    use super::{DateTime, Deserialize, Deserializer, Utc, parse_timestamp};

    /// # Errors
    ///
    /// Only fails when the input is not valid JSON for this position.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => parse_timestamp(&s),
            Some(serde_json::Value::Number(n)) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis),
            _ => None,
        })
    }

    /// # Errors
    ///
    /// Propagates serializer errors.
    #[allow(clippy::ref_option)]
    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }
}
