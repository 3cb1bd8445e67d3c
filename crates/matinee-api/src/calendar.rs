use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use matinee_db::Database;
use matinee_db::models::EventRow;

use crate::google::GoogleOAuth;
use crate::parse_db_time;

const CALENDAR_EVENTS_URL: &str =
    "https://www.googleapis.com/calendar/v3/calendars/primary/events";

/// Google Calendar v3 client. Authenticates per call with an access token
/// refreshed from the user's stored refresh token.
#[derive(Clone)]
pub struct CalendarClient {
    client: Client,
    oauth: GoogleOAuth,
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    id: String,
}

struct EventPayload {
    summary: String,
    description: String,
    starts_at: DateTime<Utc>,
    attendee_email: String,
    reminder_minutes: i64,
}

impl CalendarClient {
    pub fn new(oauth: GoogleOAuth) -> Self {
        Self {
            client: Client::new(),
            oauth,
        }
    }

    async fn insert(&self, refresh_token: &str, payload: &EventPayload) -> Result<String> {
        let access_token = self.oauth.refresh_access_token(refresh_token).await?;

        let res = self
            .client
            .post(CALENDAR_EVENTS_URL)
            .query(&[("sendUpdates", "all")])
            .bearer_auth(access_token)
            .json(&payload.to_json())
            .send()
            .await
            .context("calendar insert request failed")?;

        if !res.status().is_success() {
            bail!("calendar insert failed with status {}", res.status());
        }

        let inserted: InsertedEvent = res.json().await.context("malformed calendar response")?;
        Ok(inserted.id)
    }

    async fn update(
        &self,
        refresh_token: &str,
        google_event_id: &str,
        payload: &EventPayload,
    ) -> Result<()> {
        let access_token = self.oauth.refresh_access_token(refresh_token).await?;

        let res = self
            .client
            .put(format!("{}/{}", CALENDAR_EVENTS_URL, google_event_id))
            .query(&[("sendUpdates", "all")])
            .bearer_auth(access_token)
            .json(&payload.to_json())
            .send()
            .await
            .context("calendar update request failed")?;

        if !res.status().is_success() {
            bail!("calendar update failed with status {}", res.status());
        }
        Ok(())
    }

    async fn delete(&self, refresh_token: &str, google_event_id: &str) -> Result<()> {
        let access_token = self.oauth.refresh_access_token(refresh_token).await?;

        let res = self
            .client
            .delete(format!("{}/{}", CALENDAR_EVENTS_URL, google_event_id))
            .query(&[("sendUpdates", "all")])
            .bearer_auth(access_token)
            .send()
            .await
            .context("calendar delete request failed")?;

        // Already gone is fine
        if !res.status().is_success() && res.status() != reqwest::StatusCode::NOT_FOUND {
            bail!("calendar delete failed with status {}", res.status());
        }
        Ok(())
    }
}

impl EventPayload {
    fn from_event(event: &EventRow, attendee_email: &str) -> Option<Self> {
        if !event.remind {
            return None;
        }
        let starts_at = parse_db_time(&event.starts_at, "event start");
        let remind_at = parse_db_time(event.remind_at.as_deref()?, "event reminder");
        let reminder_minutes = (starts_at - remind_at).num_minutes().max(0);

        Some(Self {
            summary: event.title.clone(),
            description: event
                .notes
                .clone()
                .unwrap_or_else(|| format!("Movie night: {}", event.title)),
            starts_at,
            attendee_email: attendee_email.to_string(),
            reminder_minutes,
        })
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "summary": self.summary,
            "description": self.description,
            "start": { "dateTime": self.starts_at.to_rfc3339(), "timeZone": "UTC" },
            // Movie nights default to an hour on the calendar
            "end": {
                "dateTime": (self.starts_at + Duration::hours(1)).to_rfc3339(),
                "timeZone": "UTC"
            },
            "attendees": [{ "email": self.attendee_email }],
            "reminders": {
                "useDefault": false,
                "overrides": [
                    { "method": "popup", "minutes": self.reminder_minutes },
                    { "method": "email", "minutes": 60 },
                ]
            },
        })
    }
}

// -- Sync helpers used by the event handlers --

/// Create a calendar entry for one user, if their account is linked and the
/// event has a reminder. Records the google event id for later updates.
pub async fn sync_create_for_user(
    db: &Database,
    calendar: &CalendarClient,
    event: &EventRow,
    user_id: &str,
) -> Result<()> {
    let Some(refresh_token) = db.get_google_refresh_token(user_id)? else {
        return Ok(());
    };
    let user = db
        .get_user_by_id(user_id)?
        .context("calendar sync for unknown user")?;
    let Some(payload) = EventPayload::from_event(event, &user.email) else {
        return Ok(());
    };

    let google_event_id = calendar.insert(&refresh_token, &payload).await?;
    db.set_calendar_link(&event.id, user_id, &google_event_id)?;
    Ok(())
}

/// Push a reminder change to every participant's linked calendar. A reminder
/// that was switched off deletes the entries instead. Individual failures
/// are logged and skipped so one stale token can't block the rest.
pub async fn propagate_update(db: &Database, calendar: &CalendarClient, event: &EventRow) {
    let links = match db.get_calendar_links(&event.id) {
        Ok(links) => links,
        Err(e) => {
            warn!("Failed to load calendar links for event {}: {:#}", event.id, e);
            return;
        }
    };

    for link in links {
        let result = propagate_one(db, calendar, event, &link.user_id, &link.google_event_id).await;
        if let Err(e) = result {
            warn!(
                "Calendar update failed for user {} on event {}: {:#}",
                link.user_id, event.id, e
            );
        }
    }
}

async fn propagate_one(
    db: &Database,
    calendar: &CalendarClient,
    event: &EventRow,
    user_id: &str,
    google_event_id: &str,
) -> Result<()> {
    let Some(refresh_token) = db.get_google_refresh_token(user_id)? else {
        return Ok(());
    };
    let user = db.get_user_by_id(user_id)?.context("unknown user")?;

    match EventPayload::from_event(event, &user.email) {
        Some(payload) => calendar.update(&refresh_token, google_event_id, &payload).await,
        None => {
            // Reminder disabled: remove the entry and forget the mapping
            calendar.delete(&refresh_token, google_event_id).await?;
            db.remove_calendar_link(&event.id, user_id)?;
            Ok(())
        }
    }
}

/// Delete every participant's calendar entry ahead of event deletion,
/// continuing past individual failures.
pub async fn delete_all(db: &Database, calendar: &CalendarClient, event_id: &str) {
    let links = match db.get_calendar_links(event_id) {
        Ok(links) => links,
        Err(e) => {
            warn!("Failed to load calendar links for event {}: {:#}", event_id, e);
            return;
        }
    };

    for link in links {
        let result = async {
            let Some(refresh_token) = db.get_google_refresh_token(&link.user_id)? else {
                return Ok(());
            };
            calendar.delete(&refresh_token, &link.google_event_id).await
        }
        .await;

        if let Err(e) = result {
            warn!(
                "Calendar delete failed for user {} on event {}: {:#}",
                link.user_id, event_id, e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(remind: bool, remind_at: Option<&str>) -> EventRow {
        EventRow {
            id: "e1".into(),
            title: "Dune night".into(),
            group_id: None,
            created_by: "u1".into(),
            starts_at: "2026-09-05 20:00:00".into(),
            notes: None,
            remind,
            remind_at: remind_at.map(String::from),
            created_at: "2026-09-01 10:00:00".into(),
        }
    }

    #[test]
    fn payload_skipped_without_reminder() {
        assert!(EventPayload::from_event(&event(false, None), "a@b.c").is_none());
        assert!(EventPayload::from_event(&event(true, None), "a@b.c").is_none());
    }

    #[test]
    fn reminder_minutes_from_lead_time() {
        let payload =
            EventPayload::from_event(&event(true, Some("2026-09-05 19:30:00")), "a@b.c").unwrap();
        assert_eq!(payload.reminder_minutes, 30);

        let json = payload.to_json();
        assert_eq!(json["reminders"]["overrides"][0]["minutes"], 30);
        assert_eq!(json["end"]["dateTime"], "2026-09-05T21:00:00+00:00");
    }

    #[test]
    fn reminder_after_start_clamps_to_zero() {
        let payload =
            EventPayload::from_event(&event(true, Some("2026-09-05 21:00:00")), "a@b.c").unwrap();
        assert_eq!(payload.reminder_minutes, 0);
    }
}
