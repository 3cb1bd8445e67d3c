use std::sync::Arc;

use matinee_db::Database;
use matinee_gateway::dispatcher::Dispatcher;

use crate::calendar::CalendarClient;
use crate::google::GoogleOAuth;
use crate::mailer::Mailer;
use crate::media::MediaStore;
use crate::recommend::RecommenderClient;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub dispatcher: Dispatcher,

    /// Secret for session JWTs (30-day expiry).
    pub jwt_secret: String,
    /// Separate secret for short-lived password-reset JWTs.
    pub reset_secret: String,

    /// Base URL of the SPA, used for OAuth redirects and reset links.
    pub client_url: String,

    pub recommender: RecommenderClient,
    pub media: MediaStore,

    /// Unset when the deployment has no Google OAuth credentials;
    /// calendar sync and Google sign-in are then disabled.
    pub google: Option<GoogleOAuth>,
    pub calendar: Option<CalendarClient>,

    /// Unset when SMTP is not configured; forgot-password then fails
    /// with an upstream error instead of silently dropping mail.
    pub mailer: Option<Mailer>,
}
