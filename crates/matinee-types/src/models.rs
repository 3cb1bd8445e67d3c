use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback avatar for accounts that never picked one.
pub const DEFAULT_AVATAR_URL: &str = "https://api.dicebear.com/9.x/micah/svg?seed=Christopher";

/// Per-participant RSVP state for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    Pending,
    Accepted,
    Declined,
}

impl RsvpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }
}

/// Reminder settings on an event. `remind_at` is the absolute time the
/// participant wants to be pinged; the flag is derived from its presence
/// at creation but can be toggled independently later.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reminder {
    pub enabled: bool,
    pub remind_at: Option<DateTime<Utc>>,
}

/// A cached entry from the external movie catalog. `movie_id` is the
/// catalog's own identifier (TMDB), not ours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieSummary {
    pub movie_id: String,
    pub title: String,
    pub poster_url: Option<String>,
    pub rating: Option<f64>,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub overview: Option<String>,
}
