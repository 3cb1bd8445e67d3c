use std::path::PathBuf;

/// Runtime configuration, read once from the environment at startup.
/// `.env` is loaded first when present.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,

    pub jwt_secret: String,
    pub reset_secret: String,

    /// Base URL of the SPA, for OAuth redirects and reset-mail links.
    pub client_url: String,
    /// Base URL of the recommender microservice.
    pub recommender_url: String,

    pub media_dir: PathBuf,
    /// Public URL prefix under which media files are served.
    pub media_base_url: String,

    pub google: Option<GoogleConfig>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let host = var_or("MATINEE_HOST", "0.0.0.0");
        let port: u16 = var_or("MATINEE_PORT", "4000").parse()?;
        let client_url = var_or("MATINEE_CLIENT_URL", "http://localhost:5173");

        // Google sign-in and calendar sync switch off together when the
        // OAuth credentials are absent.
        let google = match (
            std::env::var("GOOGLE_CLIENT_ID"),
            std::env::var("GOOGLE_CLIENT_SECRET"),
        ) {
            (Ok(client_id), Ok(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_uri: var_or(
                    "GOOGLE_REDIRECT_URI",
                    &format!("http://localhost:{port}/api/users/auth/google/callback"),
                ),
            }),
            _ => None,
        };

        let smtp = match (
            std::env::var("SMTP_HOST"),
            std::env::var("SMTP_USER"),
            std::env::var("SMTP_PASS"),
        ) {
            (Ok(smtp_host), Ok(username), Ok(password)) => Some(SmtpConfig {
                from: var_or("SMTP_FROM", &username),
                host: smtp_host,
                username,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            media_base_url: var_or(
                "MATINEE_MEDIA_BASE_URL",
                &format!("http://localhost:{port}/media"),
            ),
            host,
            port,
            db_path: var_or("MATINEE_DB_PATH", "matinee.db").into(),
            jwt_secret: var_or("MATINEE_JWT_SECRET", "dev-secret-change-me"),
            reset_secret: var_or("MATINEE_RESET_SECRET", "dev-reset-secret-change-me"),
            client_url,
            recommender_url: var_or("MATINEE_RECOMMENDER_URL", "http://localhost:5001"),
            media_dir: var_or("MATINEE_MEDIA_DIR", "./media").into(),
            google,
            smtp,
        })
    }
}
