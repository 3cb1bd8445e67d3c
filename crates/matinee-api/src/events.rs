use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use matinee_db::models::EventRow;
use matinee_types::api::{
    Claims, CreateEventRequest, EventResponse, InviteesRequest, MarkWatchedRequest,
    ParticipantStatus, RemoveInviteeRequest, RsvpRequest, UpdateEventRequest,
};
use matinee_types::models::{Reminder, RsvpStatus};

use crate::calendar;
use crate::error::ApiError;
use crate::state::AppState;
use crate::{format_db_time, parse_db_time, parse_db_uuid};

pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }
    if let Some(group_id) = req.group_id {
        if !state
            .db
            .is_member(&group_id.to_string(), &claims.sub.to_string())?
        {
            return Err(ApiError::Forbidden("only group members can create group events"));
        }
    }

    let event_id = Uuid::new_v4();
    let group_id = req.group_id.map(|id| id.to_string());
    let remind_at = req.remind_at.map(format_db_time);

    state.db.create_event(
        &event_id.to_string(),
        &req.title,
        group_id.as_deref(),
        &claims.sub.to_string(),
        &format_db_time(req.starts_at),
        req.notes.as_deref(),
        remind_at.as_deref(),
        &req.invited_emails,
        &req.suggested_movies,
    )?;

    let event = state
        .db
        .get_event(&event_id.to_string())?
        .ok_or(ApiError::NotFound("event"))?;

    // Creator's calendar entry, when linked and a reminder is set.
    // Sync failure never fails event creation.
    if let Some(calendar_client) = &state.calendar {
        if let Err(e) =
            calendar::sync_create_for_user(&state.db, calendar_client, &event, &claims.sub.to_string())
                .await
        {
            tracing::warn!("Calendar sync failed for new event {}: {:#}", event.id, e);
        }
    }

    Ok((StatusCode::CREATED, Json(event_response(&state, event)?)))
}

pub async fn list_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.db.list_events_for_user(&claims.sub.to_string())?;
    let responses = events
        .into_iter()
        .map(|event| event_response(&state, event))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(responses))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .db
        .get_event(&event_id.to_string())?
        .ok_or(ApiError::NotFound("event"))?;
    Ok(Json(event_response(&state, event)?))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = creator_only(&state, event_id, claims.sub)?;

    // Resolve the reminder pair before touching the row
    let (remind, remind_at) = if req.cancel_reminder == Some(true) {
        (Some(false), Some(None))
    } else if let Some(remind_at) = req.remind_at {
        (Some(true), Some(Some(format_db_time(remind_at))))
    } else {
        (None, None)
    };
    let reminder_changed =
        remind.is_some_and(|r| r != event.remind) || remind_at.is_some();

    state.db.update_event(
        &event_id.to_string(),
        req.title.as_deref(),
        req.starts_at.map(format_db_time).as_deref(),
        req.notes.as_deref(),
        remind,
        remind_at.as_ref().map(|inner| inner.as_deref()),
    )?;

    if let Some(emails) = &req.invited_emails {
        state.db.add_invites(&event_id.to_string(), emails)?;
    }

    let event = state
        .db
        .get_event(&event_id.to_string())?
        .ok_or(ApiError::NotFound("event"))?;

    // Reminder changes fan out to every linked calendar; individual
    // failures are logged inside and never fail the update.
    if reminder_changed {
        if let Some(calendar_client) = &state.calendar {
            calendar::propagate_update(&state.db, calendar_client, &event).await;
        }
    }

    Ok(Json(event_response(&state, event)?))
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    creator_only(&state, event_id, claims.sub)?;

    if let Some(calendar_client) = &state.calendar {
        calendar::delete_all(&state.db, calendar_client, &event_id.to_string()).await;
    }

    state.db.delete_event_cascade(&event_id.to_string())?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "event deleted successfully",
    })))
}

pub async fn add_invitees(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InviteesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    creator_only(&state, event_id, claims.sub)?;

    state.db.add_invites(&event_id.to_string(), &req.invited_emails)?;

    let event = state
        .db
        .get_event(&event_id.to_string())?
        .ok_or(ApiError::NotFound("event"))?;
    Ok(Json(event_response(&state, event)?))
}

pub async fn remove_invitee(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RemoveInviteeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    creator_only(&state, event_id, claims.sub)?;

    state.db.remove_invite(&event_id.to_string(), &req.email)?;

    let event = state
        .db
        .get_event(&event_id.to_string())?
        .ok_or(ApiError::NotFound("event"))?;
    Ok(Json(event_response(&state, event)?))
}

pub async fn rsvp(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RsvpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.status == RsvpStatus::Pending {
        return Err(ApiError::bad_request("rsvp must be accepted or declined"));
    }

    let event = state
        .db
        .get_event(&event_id.to_string())?
        .ok_or(ApiError::NotFound("event"))?;

    state
        .db
        .set_rsvp(&event.id, &claims.sub.to_string(), req.status.as_str())?;

    Ok(Json(event_response(&state, event)?))
}

/// Record what the group actually watched. Feeds the recommender.
pub async fn mark_watched(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MarkWatchedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let event = state
        .db
        .get_event(&event_id.to_string())?
        .ok_or(ApiError::NotFound("event"))?;

    let group_id = event
        .group_id
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("event does not belong to a group"))?;
    if !state.db.is_member(group_id, &claims.sub.to_string())? {
        return Err(ApiError::Forbidden("only group members can record watch history"));
    }

    state.db.insert_history(
        &Uuid::new_v4().to_string(),
        group_id,
        &event.id,
        &req.movie_id,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "message": "watch history recorded",
        })),
    ))
}

fn creator_only(state: &AppState, event_id: Uuid, caller: Uuid) -> Result<EventRow, ApiError> {
    let event = state
        .db
        .get_event(&event_id.to_string())?
        .ok_or(ApiError::NotFound("event"))?;
    if event.created_by != caller.to_string() {
        return Err(ApiError::Forbidden("only the creator can modify this event"));
    }
    Ok(event)
}

fn event_response(state: &AppState, event: EventRow) -> Result<EventResponse, ApiError> {
    let invited_emails = state.db.get_invites(&event.id)?;
    let suggested_movies = state.db.get_event_movies(&event.id)?;
    let participants = state
        .db
        .get_participants(&event.id)?
        .into_iter()
        .map(|p| ParticipantStatus {
            user_id: parse_db_uuid(&p.user_id, "participant"),
            name: p.name,
            status: RsvpStatus::parse(&p.status).unwrap_or(RsvpStatus::Pending),
        })
        .collect();

    Ok(EventResponse {
        id: parse_db_uuid(&event.id, "event"),
        title: event.title,
        group_id: event.group_id.as_deref().map(|id| parse_db_uuid(id, "event group")),
        created_by: parse_db_uuid(&event.created_by, "event creator"),
        starts_at: parse_db_time(&event.starts_at, "event start"),
        notes: event.notes,
        invited_emails,
        participants,
        suggested_movies,
        reminder: Reminder {
            enabled: event.remind,
            remind_at: event
                .remind_at
                .as_deref()
                .map(|t| parse_db_time(t, "event reminder")),
        },
        created_at: parse_db_time(&event.created_at, "event"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::media::MediaStore;
    use crate::recommend::RecommenderClient;
    use crate::state::AppStateInner;
    use matinee_gateway::dispatcher::Dispatcher;

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: matinee_db::Database::open_in_memory().unwrap(),
            dispatcher: Dispatcher::new(),
            jwt_secret: "test-secret".to_string(),
            reset_secret: "test-reset".to_string(),
            client_url: "http://localhost:5173".to_string(),
            recommender: RecommenderClient::new("http://localhost:5001".to_string()),
            media: MediaStore::new(std::env::temp_dir(), "http://localhost:4000/media"),
            google: None,
            calendar: None,
            mailer: None,
        })
    }

    #[tokio::test]
    async fn rsvp_cannot_reset_to_pending() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            name: "tester".to_string(),
            exp: usize::MAX,
        };

        let result = rsvp(
            State(test_state()),
            Path(Uuid::new_v4()),
            Extension(claims),
            Json(RsvpRequest {
                status: RsvpStatus::Pending,
            }),
        )
        .await;

        assert!(matches!(result.err(), Some(ApiError::BadRequest(_))));
    }
}
