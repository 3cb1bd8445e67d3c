pub mod auth;
pub mod calendar;
pub mod error;
pub mod events;
pub mod google;
pub mod groups;
pub mod mailer;
pub mod media;
pub mod messages;
pub mod middleware;
pub mod polls;
pub mod recommend;
pub mod state;
pub mod watchlists;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

/// Parse a SQLite timestamp. Stored as "YYYY-MM-DD HH:MM:SS" without
/// timezone; parsed as naive UTC, with an RFC 3339 fallback.
pub(crate) fn parse_db_time(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

pub(crate) fn parse_db_uuid(raw: &str, context: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}' on {}: {}", raw, context, e);
        Uuid::default()
    })
}

/// Format a timestamp the way SQLite's datetime('now') does, for columns
/// we write explicitly (event start and reminder times).
pub(crate) fn format_db_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn db_time_round_trip() {
        let t = Utc.with_ymd_and_hms(2026, 9, 5, 20, 0, 0).unwrap();
        let raw = format_db_time(t);
        assert_eq!(raw, "2026-09-05 20:00:00");
        assert_eq!(parse_db_time(&raw, "test"), t);
    }

    #[test]
    fn db_time_accepts_rfc3339() {
        let parsed = parse_db_time("2026-09-05T20:00:00Z", "test");
        assert_eq!(format_db_time(parsed), "2026-09-05 20:00:00");
    }
}
