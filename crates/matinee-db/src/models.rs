/// Database row types — these map directly to SQLite rows.
/// Distinct from matinee-types API models to keep the storage layer independent.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub google_id: Option<String>,
    pub google_refresh_token: Option<String>,
    pub profile_pic: String,
    pub created_at: String,
}

pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_by: String,
    pub invite_token: String,
    pub created_at: String,
}

pub struct MemberRow {
    pub user_id: String,
    pub name: String,
    pub profile_pic: String,
}

pub struct EventRow {
    pub id: String,
    pub title: String,
    pub group_id: Option<String>,
    pub created_by: String,
    pub starts_at: String,
    pub notes: Option<String>,
    pub remind: bool,
    pub remind_at: Option<String>,
    pub created_at: String,
}

pub struct ParticipantRow {
    pub user_id: String,
    pub name: String,
    pub status: String,
}

pub struct CalendarLinkRow {
    pub user_id: String,
    pub google_event_id: String,
}

pub struct MessageRow {
    pub id: String,
    pub event_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_profile_pic: String,
    pub text: Option<String>,
    pub image_url: Option<String>,
    pub created_at: String,
}

pub struct PollRow {
    pub id: String,
    pub event_id: String,
    pub created_by: String,
    pub question: String,
    /// JSON array of option strings, in display order.
    pub options: String,
    pub created_at: String,
}

pub struct VoteRow {
    pub user_id: String,
    pub option: String,
}

pub struct MovieRow {
    pub movie_id: String,
    pub title: String,
    pub poster_url: Option<String>,
    pub rating: Option<f64>,
    pub year: Option<i32>,
    /// JSON array of genre strings.
    pub genres: String,
    pub overview: Option<String>,
}

pub struct WatchlistRow {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub created_at: String,
}

pub struct HistoryRow {
    pub id: String,
    pub group_id: String,
    pub event_id: String,
    pub watched_movie: String,
    pub created_at: String,
}
