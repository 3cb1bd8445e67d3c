use anyhow::{Context, Result, bail};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
};
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use matinee_types::models::DEFAULT_AVATAR_URL;

use crate::auth::create_token;
use crate::error::ApiError;
use crate::state::AppState;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// OAuth scopes: identity plus calendar event access for reminder sync.
const SCOPES: &str = "profile email https://www.googleapis.com/auth/calendar.events";

/// Google OAuth client. Also used by the calendar client for access-token
/// refresh.
#[derive(Clone)]
pub struct GoogleOAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Only present on first consent (access_type=offline).
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl GoogleOAuth {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client: Client::new(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// URL of Google's consent screen. `prompt=consent` forces a refresh
    /// token to be re-issued.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent+select_account",
            AUTH_ENDPOINT,
            urlencode(&self.client_id),
            urlencode(&self.redirect_uri),
            urlencode(SCOPES),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let res = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .context("token exchange request failed")?;

        if !res.status().is_success() {
            bail!("token exchange failed with status {}", res.status());
        }

        res.json().await.context("malformed token response")
    }

    /// Trade a stored refresh token for a fresh access token.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String> {
        let res = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("token refresh request failed")?;

        if !res.status().is_success() {
            bail!("token refresh failed with status {}", res.status());
        }

        let token: TokenResponse = res.json().await.context("malformed refresh response")?;
        Ok(token.access_token)
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleUser> {
        let res = self
            .client
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await
            .context("userinfo request failed")?;

        if !res.status().is_success() {
            bail!("userinfo failed with status {}", res.status());
        }

        res.json().await.context("malformed userinfo response")
    }
}

fn urlencode(s: &str) -> String {
    // Query-string percent-encoding for the handful of characters OAuth
    // parameters can contain.
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'+' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

// -- Handlers --

/// GET /api/users/auth/google — off to the consent screen.
pub async fn google_auth(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let oauth = state
        .google
        .as_ref()
        .ok_or_else(|| ApiError::Upstream(anyhow::anyhow!("google oauth not configured")))?;
    Ok(Redirect::temporary(&oauth.authorize_url()))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// GET /api/users/auth/google/callback — exchanges the code, upserts the
/// user, issues a session JWT and redirects to the SPA. Failures redirect
/// to the signup page instead of erroring.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> impl IntoResponse {
    match complete_sign_in(&state, query).await {
        Ok((user_id, token)) => Redirect::temporary(&format!(
            "{}/auth?token={}&userId={}",
            state.client_url, token, user_id
        )),
        Err(e) => {
            tracing::warn!("Google sign-in failed: {:#}", e);
            Redirect::temporary(&format!("{}/signup", state.client_url))
        }
    }
}

async fn complete_sign_in(state: &AppState, query: CallbackQuery) -> Result<(Uuid, String)> {
    let oauth = state.google.as_ref().context("google oauth not configured")?;

    if let Some(error) = query.error {
        bail!("consent denied: {}", error);
    }
    let code = query.code.context("missing authorization code")?;

    let tokens = oauth.exchange_code(&code).await?;
    let info = oauth.fetch_userinfo(&tokens.access_token).await?;

    // Upsert by email: an existing account gets Google linked, a new one
    // gets created without a password.
    let user_id = match state.db.get_user_by_email(&info.email)? {
        Some(user) => crate::parse_db_uuid(&user.id, "user"),
        None => {
            let user_id = Uuid::new_v4();
            let name = info.name.clone().unwrap_or_else(|| info.email.clone());
            let profile_pic = info
                .picture
                .clone()
                .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string());
            state
                .db
                .create_user(&user_id.to_string(), &name, &info.email, None, &profile_pic)?;
            user_id
        }
    };

    state.db.link_google_account(
        &user_id.to_string(),
        &info.id,
        tokens.refresh_token.as_deref(),
    )?;

    let user = state
        .db
        .get_user_by_id(&user_id.to_string())?
        .context("user vanished during sign-in")?;
    let token = create_token(&state.jwt_secret, user_id, &user.name)
        .map_err(|e| anyhow::anyhow!("token creation failed: {}", e))?;

    Ok((user_id, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_offline_access() {
        let oauth = GoogleOAuth::new(
            "client-id".into(),
            "shh".into(),
            "http://localhost:4000/api/users/auth/google/callback".into(),
        );
        let url = oauth.authorize_url();
        assert!(url.starts_with(AUTH_ENDPOINT));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("calendar.events"));
        // secret never leaks into the URL
        assert!(!url.contains("shh"));
    }

    #[test]
    fn urlencode_escapes_reserved_chars() {
        assert_eq!(urlencode("a b&c"), "a+b%26c");
        assert_eq!(urlencode("https://x.y/z"), "https%3A%2F%2Fx.y%2Fz");
    }
}
