use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use matinee_db::models::PollRow;
use matinee_types::api::{Claims, CreatePollRequest, PollResponse, PollTally, VoteRequest};
use matinee_types::events::GatewayEvent;

use crate::error::ApiError;
use crate::state::AppState;
use crate::{parse_db_time, parse_db_uuid};

/// POST /api/polls — open a poll in an event room.
pub async fn create_poll(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreatePollRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.question.trim().is_empty() {
        return Err(ApiError::bad_request("question is required"));
    }
    let options: Vec<String> = req
        .options
        .iter()
        .map(|o| o.trim().to_owned())
        .filter(|o| !o.is_empty())
        .collect();
    if options.len() < 2 {
        return Err(ApiError::bad_request("a poll needs at least two options"));
    }

    state
        .db
        .get_event(&req.event_id.to_string())?
        .ok_or(ApiError::NotFound("event"))?;

    let poll_id = Uuid::new_v4();
    let options_json = serde_json::to_string(&options).map_err(anyhow::Error::from)?;
    state.db.insert_poll(
        &poll_id.to_string(),
        &req.event_id.to_string(),
        &claims.sub.to_string(),
        &req.question,
        &options_json,
    )?;

    let row = state
        .db
        .get_poll(&poll_id.to_string())?
        .ok_or(ApiError::NotFound("poll"))?;
    let response = poll_response(row, &[]);

    state.dispatcher.broadcast(GatewayEvent::PollCreate {
        id: poll_id,
        event_id: req.event_id,
        created_by: claims.sub,
        question: response.question.clone(),
        options: response.options.clone(),
        timestamp: response.created_at,
    });

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/polls/{poll_id}/vote — one vote per user, re-voting
/// replaces the previous choice. Every vote pushes fresh tallies to
/// the room.
pub async fn vote(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_poll(&poll_id.to_string())?
        .ok_or(ApiError::NotFound("poll"))?;

    let options: Vec<String> =
        serde_json::from_str(&row.options).map_err(anyhow::Error::from)?;
    if !options.contains(&req.option) {
        return Err(ApiError::bad_request("option is not part of this poll"));
    }

    state
        .db
        .upsert_vote(&poll_id.to_string(), &claims.sub.to_string(), &req.option)?;

    let counts = state.db.get_vote_counts(&poll_id.to_string())?;
    let response = poll_response(row, &counts);
    let event_id = response.event_id;

    state.dispatcher.broadcast(GatewayEvent::PollVote {
        poll_id,
        event_id,
        user_id: claims.sub,
        option: req.option,
    });
    state.dispatcher.broadcast(GatewayEvent::PollUpdate {
        poll_id,
        event_id,
        total_votes: response.total_votes,
        tallies: response.tallies.clone(),
    });

    Ok(Json(response))
}

/// GET /api/polls/{poll_id}
pub async fn get_poll(
    State(state): State<AppState>,
    Path(poll_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_poll(&poll_id.to_string())?
        .ok_or(ApiError::NotFound("poll"))?;
    let counts = state.db.get_vote_counts(&poll_id.to_string())?;
    Ok(Json(poll_response(row, &counts)))
}

/// Builds the wire shape from a row plus per-option counts. Options
/// that nobody voted for still get a zero tally so clients can render
/// every bar.
pub(crate) fn poll_response(row: PollRow, counts: &[(String, u32)]) -> PollResponse {
    let options: Vec<String> = serde_json::from_str(&row.options).unwrap_or_default();
    let (tallies, total_votes) = compute_tallies(&options, counts);

    PollResponse {
        id: parse_db_uuid(&row.id, "poll"),
        event_id: parse_db_uuid(&row.event_id, "poll event"),
        created_by: parse_db_uuid(&row.created_by, "poll creator"),
        question: row.question,
        options,
        tallies,
        total_votes,
        created_at: parse_db_time(&row.created_at, "poll"),
    }
}

fn compute_tallies(options: &[String], counts: &[(String, u32)]) -> (Vec<PollTally>, u32) {
    let total: u32 = counts.iter().map(|(_, n)| n).sum();
    let tallies = options
        .iter()
        .map(|option| {
            let votes = counts
                .iter()
                .find(|(o, _)| o == option)
                .map(|(_, n)| *n)
                .unwrap_or(0);
            let percent = if total == 0 {
                0.0
            } else {
                // one decimal place, matching what clients display
                (votes as f64 * 1000.0 / total as f64).round() / 10.0
            };
            PollTally {
                option: option.clone(),
                votes,
                percent,
            }
        })
        .collect();
    (tallies, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tallies_cover_unvoted_options() {
        let (tallies, total) = compute_tallies(
            &opts(&["Dune", "Alien", "Heat"]),
            &[("Dune".into(), 2), ("Alien".into(), 1)],
        );
        assert_eq!(total, 3);
        assert_eq!(tallies.len(), 3);
        assert_eq!(tallies[2].votes, 0);
        assert_eq!(tallies[2].percent, 0.0);
    }

    #[test]
    fn percentages_round_to_one_decimal() {
        let (tallies, total) =
            compute_tallies(&opts(&["A", "B", "C"]), &[("A".into(), 1), ("B".into(), 2)]);
        assert_eq!(total, 3);
        assert_eq!(tallies[0].percent, 33.3);
        assert_eq!(tallies[1].percent, 66.7);
    }

    #[test]
    fn zero_votes_means_zero_percent_everywhere() {
        let (tallies, total) = compute_tallies(&opts(&["A", "B"]), &[]);
        assert_eq!(total, 0);
        assert!(tallies.iter().all(|t| t.percent == 0.0 && t.votes == 0));
    }
}
