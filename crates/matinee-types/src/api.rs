use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{MovieSummary, Reminder, RsvpStatus};

// -- JWT Claims --

/// JWT claims shared between matinee-api (REST middleware) and
/// matinee-gateway (WebSocket Identify). Canonical definition lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub profile_pic: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub profile_pic: String,
    pub google_linked: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub profile_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

// -- Groups --

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinGroupRequest {
    pub invite_token: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub user_id: Uuid,
    pub name: String,
    pub profile_pic: String,
}

#[derive(Debug, Serialize)]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_by: Uuid,
    pub invite_token: String,
    pub members: Vec<MemberSummary>,
    pub created_at: DateTime<Utc>,
}

// -- Events --

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    pub group_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub notes: Option<String>,
    #[serde(default)]
    pub invited_emails: Vec<String>,
    #[serde(default)]
    pub suggested_movies: Vec<String>,
    pub remind_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub invited_emails: Option<Vec<String>>,
    pub remind_at: Option<DateTime<Utc>>,
    /// Explicitly disable the reminder (and drop synced calendar entries).
    pub cancel_reminder: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantStatus {
    pub user_id: Uuid,
    pub name: String,
    pub status: RsvpStatus,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub title: String,
    pub group_id: Option<Uuid>,
    pub created_by: Uuid,
    pub starts_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub invited_emails: Vec<String>,
    pub participants: Vec<ParticipantStatus>,
    pub suggested_movies: Vec<String>,
    pub reminder: Reminder,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct InviteesRequest {
    pub invited_emails: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveInviteeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct RsvpRequest {
    pub status: RsvpStatus,
}

#[derive(Debug, Deserialize)]
pub struct MarkWatchedRequest {
    pub movie_id: String,
}

// -- Chat --

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: Option<String>,
    /// Base64-encoded jpeg/png payload; stored server-side, referenced by URL.
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_profile_pic: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of the combined chat feed: either a message or a poll,
/// interleaved by creation time.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedItem {
    Message(MessageResponse),
    Poll(PollResponse),
}

impl FeedItem {
    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Message(m) => m.created_at,
            Self::Poll(p) => p.created_at,
        }
    }
}

// -- Polls --

#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub event_id: Uuid,
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub created_by: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub tallies: Vec<PollTally>,
    pub total_votes: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub option: String,
}

/// Per-option vote count plus live percentage (one decimal place).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollTally {
    pub option: String,
    pub votes: u32,
    pub percent: f64,
}

// -- Watchlist --

#[derive(Debug, Deserialize)]
pub struct AddWatchlistMovieRequest {
    pub movie_id: String,
    pub title: String,
    pub poster_url: Option<String>,
    pub rating: Option<f64>,
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub overview: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WatchlistResponse {
    pub id: Uuid,
    pub name: String,
    pub movies: Vec<MovieSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ContainsQuery {
    pub movie_id: String,
}

// -- Recommendations --

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub movie_ids: Vec<String>,
    /// Cached metadata for ids we already know about; the client fills the
    /// rest from the catalog API directly.
    pub known: Vec<MovieSummary>,
}

// -- Media --

#[derive(Debug, Serialize)]
pub struct MediaUploadResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_item_tags_discriminate() {
        let msg = FeedItem::Message(MessageResponse {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            sender_name: "dana".into(),
            sender_profile_pic: "x".into(),
            text: Some("hi".into()),
            image_url: None,
            created_at: Utc::now(),
        });

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "message");
        assert_eq!(json["text"], "hi");
    }

    #[test]
    fn rsvp_status_round_trips_through_db_strings() {
        for status in [RsvpStatus::Pending, RsvpStatus::Accepted, RsvpStatus::Declined] {
            assert_eq!(RsvpStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RsvpStatus::parse("maybe"), None);
    }
}
