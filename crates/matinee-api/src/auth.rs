use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use matinee_types::api::{
    Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, ProfileResponse, RegisterRequest,
    RegisterResponse, ResetPasswordRequest, UpdateProfileRequest,
};
use matinee_types::models::DEFAULT_AVATAR_URL;

use crate::error::ApiError;
use crate::state::AppState;

/// Claims for the short-lived password-reset token; signed with a
/// different secret than session JWTs.
#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    email: String,
    exp: usize,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if !looks_like_email(&req.email) {
        return Err(ApiError::bad_request("please enter a valid email"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Conflict("user already exists"));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();
    let profile_pic = req
        .profile_pic
        .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string());

    state.db.create_user(
        &user_id.to_string(),
        &req.name,
        &req.email,
        Some(&password_hash),
        &profile_pic,
    )?;

    let token = create_token(&state.jwt_secret, user_id, &req.name)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::Unauthorized)?;

    // Google-only accounts have no password hash
    let stored = user.password.as_deref().ok_or(ApiError::Unauthorized)?;

    let parsed_hash = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt password hash: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id = crate::parse_db_uuid(&user.id, "user");
    let token = create_token(&state.jwt_secret, user_id, &user.name)?;

    Ok(Json(LoginResponse {
        user_id,
        name: user.name,
        profile_pic: user.profile_pic,
        token,
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(ProfileResponse {
        user_id: claims.sub,
        name: user.name,
        email: user.email,
        profile_pic: user.profile_pic,
        google_linked: user.google_refresh_token.is_some(),
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Email is deliberately not editable
    let updated = state.db.update_profile(
        &claims.sub.to_string(),
        req.name.as_deref(),
        req.profile_pic.as_deref(),
    )?;
    if !updated {
        return Err(ApiError::NotFound("user"));
    }

    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound("user"))?;

    Ok(Json(ProfileResponse {
        user_id: claims.sub,
        name: user.name,
        email: user.email,
        profile_pic: user.profile_pic,
        google_linked: user.google_refresh_token.is_some(),
    }))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::NotFound("user"))?;

    let claims = ResetClaims {
        email: user.email.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::minutes(15)).timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.reset_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))?;

    let reset_url = format!("{}/reset-password/{}", state.client_url, token);

    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| ApiError::Upstream(anyhow::anyhow!("mail transport not configured")))?;
    mailer
        .send_password_reset(&user.email, &reset_url)
        .await
        .map_err(ApiError::Upstream)?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "reset email sent",
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token_data = decode::<ResetClaims>(
        &req.token,
        &DecodingKey::from_secret(state.reset_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::bad_request("invalid or expired token"))?;

    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }

    let password_hash = hash_password(&req.password)?;
    let updated = state
        .db
        .set_password(&token_data.claims.email, &password_hash)?;
    if !updated {
        return Err(ApiError::NotFound("user"));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "password reset successfully",
    })))
}

/// Sessions are stateless JWTs; logout exists so clients have a uniform
/// endpoint to call while discarding the token locally.
pub async fn logout() -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "message": "logged out",
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, name: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(e.into()))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))
}

/// Just enough shape-checking to catch typos; real validation is the
/// confirmation mail.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("movie.fan@example.com"));
        assert!(!looks_like_email("not-an-email"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("user@nodot"));
        assert!(!looks_like_email("user@.com"));
    }

    #[test]
    fn session_token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = create_token("secret", user_id, "Priya").unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, user_id);
        assert_eq!(decoded.claims.name, "Priya");
    }

    #[test]
    fn session_token_rejects_wrong_secret() {
        let token = create_token("secret", Uuid::new_v4(), "Priya").unwrap();
        assert!(
            decode::<Claims>(
                &token,
                &DecodingKey::from_secret(b"other"),
                &Validation::default(),
            )
            .is_err()
        );
    }
}
