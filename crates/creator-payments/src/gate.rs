//! Subscription Gate
//!
//! Decides whether a subscriber currently holds PRO access. The stored
//! expiry always wins over the stored flag, and anything that cannot be
//! read as an instant counts as expired.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::subscriber::SubscriberRecord;

/// Offset-qualified formats, tried after RFC 3339
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%#z"];

/// Formats without an offset; read as UTC
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Why a subscriber is or is not entitled
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EntitlementStatus {
    NoRecord,
    /// Flag is off
    Inactive,
    /// Flag is on but the expiry is missing or unreadable
    InvalidExpiry,
    Expired { expired_at: DateTime<Utc> },
    Active { expires_at: DateTime<Utc> },
}

impl EntitlementStatus {
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// Normalize a stored expiry to a UTC instant
///
/// Accepts RFC 3339, short offsets such as `+00`, naive timestamps (read as
/// UTC) and bare dates (midnight UTC). Returns `None` for anything else.
pub fn normalize_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Evaluate a subscriber record at `now`
pub fn evaluate(record: Option<&SubscriberRecord>, now: DateTime<Utc>) -> EntitlementStatus {
    let Some(record) = record else {
        return EntitlementStatus::NoRecord;
    };

    if !record.has_active_entitlement {
        return EntitlementStatus::Inactive;
    }

    let Some(expires_at) = record.entitlement_expires_at.as_deref().and_then(normalize_expiry) else {
        tracing::warn!(
            subscriber_id = %record.id,
            expiry = ?record.entitlement_expires_at,
            "Unreadable entitlement expiry, treating as expired"
        );
        return EntitlementStatus::InvalidExpiry;
    };

    if expires_at > now {
        EntitlementStatus::Active { expires_at }
    } else {
        EntitlementStatus::Expired { expired_at: expires_at }
    }
}

/// True iff the record grants PRO access at `now`
pub fn is_entitled(record: Option<&SubscriberRecord>, now: DateTime<Utc>) -> bool {
    evaluate(record, now).is_active()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn pro_record(expiry: Option<&str>) -> SubscriberRecord {
        let mut record = SubscriberRecord::new("12345", Utc::now());
        record.has_active_entitlement = true;
        record.entitlement_expires_at = expiry.map(String::from);
        record
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_record_is_not_entitled() {
        assert!(!is_entitled(None, now()));
        assert_eq!(evaluate(None, now()), EntitlementStatus::NoRecord);
    }

    #[test]
    fn test_one_second_either_side_of_expiry() {
        let past = (now() - Duration::seconds(1)).to_rfc3339();
        let future = (now() + Duration::seconds(1)).to_rfc3339();

        assert!(!is_entitled(Some(&pro_record(Some(&past))), now()));
        assert!(is_entitled(Some(&pro_record(Some(&future))), now()));
    }

    #[test]
    fn test_expiry_equal_to_now_is_expired() {
        let record = pro_record(Some(&now().to_rfc3339()));
        assert!(matches!(evaluate(Some(&record), now()), EntitlementStatus::Expired { .. }));
    }

    #[test]
    fn test_flag_off_wins_over_future_expiry() {
        let mut record = pro_record(Some("2099-01-01T00:00:00Z"));
        record.has_active_entitlement = false;
        assert_eq!(evaluate(Some(&record), now()), EntitlementStatus::Inactive);
    }

    #[test]
    fn test_unparsable_expiry_fails_closed() {
        let record = pro_record(Some("not-a-date"));
        assert!(!is_entitled(Some(&record), now()));
        assert_eq!(evaluate(Some(&record), now()), EntitlementStatus::InvalidExpiry);

        let record = pro_record(None);
        assert_eq!(evaluate(Some(&record), now()), EntitlementStatus::InvalidExpiry);
    }

    #[test]
    fn test_normalize_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 20, 12, 33, 0).unwrap();

        assert_eq!(normalize_expiry("2026-01-20T12:33:00Z"), Some(expected));
        assert_eq!(normalize_expiry("2026-01-20T13:33:00+01:00"), Some(expected));
        assert_eq!(normalize_expiry("2026-01-20T12:33:00+00"), Some(expected));
        assert_eq!(normalize_expiry("2026-01-20 12:33:00+00"), Some(expected));
        assert_eq!(normalize_expiry("2026-01-20T12:33:00"), Some(expected));
        assert_eq!(normalize_expiry("2026-01-20 12:33:00.000"), Some(expected));
        assert_eq!(
            normalize_expiry("2026-01-20"),
            Some(Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap())
        );
        assert_eq!(normalize_expiry(""), None);
        assert_eq!(normalize_expiry("tomorrow"), None);
    }

    #[test]
    fn test_naive_expiry_is_read_as_utc() {
        // 12:30 naive is 12:30 UTC, so it has passed at 13:00 UTC
        let record = pro_record(Some("2026-01-20 12:30:00"));
        let later = Utc.with_ymd_and_hms(2026, 1, 20, 13, 0, 0).unwrap();
        assert!(!is_entitled(Some(&record), later));
        assert!(is_entitled(Some(&record), now()));
    }
}
