use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use matinee_types::api::{Claims, RecommendationsResponse};
use matinee_types::models::MovieSummary;

use crate::error::ApiError;
use crate::state::AppState;
use crate::watchlists::movie_summary;

/// How much watch history to score against.
const HISTORY_WINDOW: u32 = 20;

/// Thin client for the recommender microservice. Scoring lives over
/// there; we supply the group's watch history and proxy the result.
#[derive(Debug, Clone)]
pub struct RecommenderClient {
    client: reqwest::Client,
    base_url: String,
}

/// What the scoring service sends back: a bare array of these.
#[derive(Debug, Deserialize)]
pub struct RecommendedMovie {
    pub id: serde_json::Number,
    pub title: String,
    #[serde(default)]
    pub poster: String,
}

impl RecommenderClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// POST {base}/recommend with the watched ids, best matches first.
    pub async fn recommend(&self, watched_ids: &[String]) -> anyhow::Result<Vec<RecommendedMovie>> {
        let url = format!("{}/recommend", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "watchedIds": watched_ids }))
            .send()
            .await
            .context("recommender request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("recommender returned {}", resp.status());
        }
        resp.json()
            .await
            .context("recommender returned malformed JSON")
    }
}

/// GET /api/recommendations/group/{group_id} — scores against the
/// group's recent watch history. A group that has watched nothing yet
/// gets an empty list rather than an error.
pub async fn group_recommendations(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if !state
        .db
        .is_member(&group_id.to_string(), &claims.sub.to_string())?
    {
        return Err(ApiError::Forbidden("only group members can get recommendations"));
    }

    let watched = state
        .db
        .recent_watched_for_group(&group_id.to_string(), HISTORY_WINDOW)?;
    if watched.is_empty() {
        return Ok(Json(RecommendationsResponse {
            movie_ids: vec![],
            known: vec![],
        }));
    }

    let recommended = state
        .recommender
        .recommend(&watched)
        .await
        .map_err(ApiError::Upstream)?;
    let movie_ids: Vec<String> = recommended.iter().map(|m| m.id.to_string()).collect();

    // Cached metadata wins; ids the cache has never seen fall back to
    // the title and poster the service sent along.
    let mut known: Vec<MovieSummary> = state
        .db
        .get_movies(&movie_ids)?
        .into_iter()
        .map(movie_summary)
        .collect();
    for movie in &recommended {
        let id = movie.id.to_string();
        if !known.iter().any(|k| k.movie_id == id) {
            known.push(MovieSummary {
                movie_id: id,
                title: movie.title.clone(),
                poster_url: (!movie.poster.is_empty()).then(|| movie.poster.clone()),
                rating: None,
                year: None,
                genres: vec![],
                overview: None,
            });
        }
    }

    Ok(Json(RecommendationsResponse { movie_ids, known }))
}
