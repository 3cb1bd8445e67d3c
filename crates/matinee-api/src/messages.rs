use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use matinee_db::models::MessageRow;
use matinee_types::api::{Claims, FeedItem, MessageResponse, SendMessageRequest};
use matinee_types::events::GatewayEvent;
use matinee_types::models::DEFAULT_AVATAR_URL;

use crate::error::ApiError;
use crate::polls::poll_response;
use crate::state::AppState;
use crate::{parse_db_time, parse_db_uuid};

/// POST /api/events/{event_id}/messages — text and/or image chat message.
/// Images arrive base64-encoded and are stored on disk; only the URL
/// goes in the database.
pub async fn send_message(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
    if text.is_none() && req.image.is_none() {
        return Err(ApiError::bad_request("message needs text or an image"));
    }

    state
        .db
        .get_event(&event_id.to_string())?
        .ok_or(ApiError::NotFound("event"))?;

    let image_url = match &req.image {
        Some(data) => Some(
            state
                .media
                .save_base64_image(data)
                .await
                .map_err(|e| ApiError::BadRequest(format!("{e:#}")))?,
        ),
        None => None,
    };

    let message_id = Uuid::new_v4();

    // Run blocking DB work off the async runtime
    let db = state.clone();
    let mid = message_id.to_string();
    let eid = event_id.to_string();
    let sid = claims.sub.to_string();
    let text_owned = text.map(str::to_owned);
    let url = image_url.clone();
    let profile_pic = tokio::task::spawn_blocking(move || {
        db.db
            .insert_message(&mid, &eid, &sid, text_owned.as_deref(), url.as_deref())?;
        let user = db.db.get_user_by_id(&sid)?;
        Ok::<_, anyhow::Error>(user.map(|u| u.profile_pic))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??
    .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string());

    let now = chrono::Utc::now();

    // Fan out to everyone subscribed to this event's room
    state.dispatcher.broadcast(GatewayEvent::MessageCreate {
        id: message_id,
        event_id,
        sender_id: claims.sub,
        sender_name: claims.name.clone(),
        text: text.map(str::to_owned),
        image_url: image_url.clone(),
        timestamp: now,
    });

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id: message_id,
            event_id,
            sender_id: claims.sub,
            sender_name: claims.name.clone(),
            sender_profile_pic: profile_pic,
            text: text.map(str::to_owned),
            image_url,
            created_at: now,
        }),
    ))
}

/// GET /api/events/{event_id}/feed — messages and polls interleaved,
/// newest first, so the client renders one chronological feed.
pub async fn get_feed(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let eid = event_id.to_string();
    let (message_rows, poll_rows, vote_counts) = tokio::task::spawn_blocking(move || {
        let messages = db.db.get_messages_for_event(&eid)?;
        let polls = db.db.get_polls_for_event(&eid)?;
        let mut counts = Vec::with_capacity(polls.len());
        for poll in &polls {
            counts.push(db.db.get_vote_counts(&poll.id)?);
        }
        Ok::<_, anyhow::Error>((messages, polls, counts))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })??;

    let mut feed: Vec<FeedItem> = message_rows
        .into_iter()
        .map(|row| FeedItem::Message(message_response(row)))
        .collect();
    feed.extend(
        poll_rows
            .into_iter()
            .zip(vote_counts)
            .map(|(row, counts)| FeedItem::Poll(poll_response(row, &counts))),
    );

    // Both sources come back newest-first; re-sort after the merge
    feed.sort_by_key(|item| std::cmp::Reverse(item.created_at()));

    Ok(Json(feed))
}

pub(crate) fn message_response(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: parse_db_uuid(&row.id, "message"),
        event_id: parse_db_uuid(&row.event_id, "message event"),
        sender_id: parse_db_uuid(&row.sender_id, "message sender"),
        sender_name: row.sender_name,
        sender_profile_pic: row.sender_profile_pic,
        text: row.text,
        image_url: row.image_url,
        created_at: parse_db_time(&row.created_at, "message"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matinee_db::models::PollRow;

    fn msg(id: &str, created_at: &str) -> FeedItem {
        FeedItem::Message(message_response(MessageRow {
            id: id.into(),
            event_id: "7d9f3c1a-0000-4000-8000-000000000001".into(),
            sender_id: "7d9f3c1a-0000-4000-8000-000000000002".into(),
            sender_name: "Ana".into(),
            sender_profile_pic: DEFAULT_AVATAR_URL.into(),
            text: Some("hi".into()),
            image_url: None,
            created_at: created_at.into(),
        }))
    }

    fn poll(id: &str, created_at: &str) -> FeedItem {
        FeedItem::Poll(poll_response(
            PollRow {
                id: id.into(),
                event_id: "7d9f3c1a-0000-4000-8000-000000000001".into(),
                created_by: "7d9f3c1a-0000-4000-8000-000000000002".into(),
                question: "Which one?".into(),
                options: r#"["Dune","Alien"]"#.into(),
                created_at: created_at.into(),
            },
            &[],
        ))
    }

    #[test]
    fn feed_interleaves_newest_first() {
        let mut feed = vec![
            msg("7d9f3c1a-0000-4000-8000-00000000000a", "2026-03-01 20:00:00"),
            msg("7d9f3c1a-0000-4000-8000-00000000000b", "2026-03-01 18:00:00"),
            poll("7d9f3c1a-0000-4000-8000-00000000000c", "2026-03-01 19:00:00"),
        ];
        feed.sort_by_key(|item| std::cmp::Reverse(item.created_at()));

        let kinds: Vec<&str> = feed
            .iter()
            .map(|i| match i {
                FeedItem::Message(_) => "message",
                FeedItem::Poll(_) => "poll",
            })
            .collect();
        assert_eq!(kinds, ["message", "poll", "message"]);
    }
}
