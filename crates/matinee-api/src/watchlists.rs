use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use matinee_db::models::MovieRow;
use matinee_types::api::{AddWatchlistMovieRequest, Claims, ContainsQuery, WatchlistResponse};
use matinee_types::models::MovieSummary;

use crate::error::ApiError;
use crate::state::AppState;
use crate::{parse_db_time, parse_db_uuid};

/// POST /api/watchlist — caches the movie metadata and pins it to the
/// caller's list. Adding the same movie twice is a no-op.
pub async fn add_movie(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddWatchlistMovieRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.movie_id.trim().is_empty() || req.title.trim().is_empty() {
        return Err(ApiError::bad_request("movie_id and title are required"));
    }

    let genres_json = serde_json::to_string(&req.genres).map_err(anyhow::Error::from)?;
    state.db.upsert_movie(
        &req.movie_id,
        &req.title,
        req.poster_url.as_deref(),
        req.rating,
        req.year,
        &genres_json,
        req.overview.as_deref(),
    )?;

    let watchlist = state
        .db
        .get_or_create_watchlist(&Uuid::new_v4().to_string(), &claims.sub.to_string())?;
    let added = state.db.add_watchlist_movie(&watchlist.id, &req.movie_id)?;

    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(serde_json::json!({ "success": true, "added": added }))))
}

/// GET /api/watchlist
pub async fn get_watchlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let watchlist = state
        .db
        .get_or_create_watchlist(&Uuid::new_v4().to_string(), &claims.sub.to_string())?;
    let movies: Vec<MovieSummary> = state
        .db
        .get_watchlist_movies(&watchlist.id)?
        .into_iter()
        .map(movie_summary)
        .collect();

    Ok(Json(WatchlistResponse {
        id: parse_db_uuid(&watchlist.id, "watchlist"),
        name: watchlist.name,
        movies,
        created_at: parse_db_time(&watchlist.created_at, "watchlist"),
    }))
}

/// DELETE /api/watchlist/{movie_id}
pub async fn remove_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let watchlist = state
        .db
        .get_or_create_watchlist(&Uuid::new_v4().to_string(), &claims.sub.to_string())?;
    let removed = state.db.remove_watchlist_movie(&watchlist.id, &movie_id)?;
    if !removed {
        return Err(ApiError::NotFound("watchlist movie"));
    }

    Ok(Json(serde_json::json!({
        "success": true,
        "message": "movie removed from watchlist",
    })))
}

/// GET /api/watchlist/contains?movie_id=... — lets the client flip the
/// bookmark icon without pulling the whole list.
pub async fn contains(
    State(state): State<AppState>,
    Query(query): Query<ContainsQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let contained = state
        .db
        .watchlist_contains(&claims.sub.to_string(), &query.movie_id)?;
    Ok(Json(serde_json::json!({ "contains": contained })))
}

pub(crate) fn movie_summary(row: MovieRow) -> MovieSummary {
    MovieSummary {
        movie_id: row.movie_id,
        title: row.title,
        poster_url: row.poster_url,
        rating: row.rating,
        year: row.year,
        genres: serde_json::from_str(&row.genres).unwrap_or_default(),
        overview: row.overview,
    }
}
