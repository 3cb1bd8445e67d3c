use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use matinee_api::state::{AppState, AppStateInner};
use matinee_api::middleware::require_auth;
use matinee_api::{auth, calendar, events, google, groups, media, messages, polls, recommend, watchlists};
use matinee_gateway::connection;
use matinee_gateway::dispatcher::Dispatcher;

mod config;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matinee=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = matinee_db::Database::open(&config.db_path)?;

    let dispatcher = Dispatcher::new();

    let google_oauth = config.google.as_ref().map(|g| {
        google::GoogleOAuth::new(
            g.client_id.clone(),
            g.client_secret.clone(),
            g.redirect_uri.clone(),
        )
    });
    if google_oauth.is_none() {
        info!("Google OAuth not configured; sign-in with Google and calendar sync disabled");
    }
    let calendar_client = google_oauth.clone().map(calendar::CalendarClient::new);

    let mailer = match &config.smtp {
        Some(smtp) => Some(matinee_api::mailer::Mailer::new(
            &smtp.host,
            &smtp.username,
            &smtp.password,
            &smtp.from,
        )?),
        None => {
            info!("SMTP not configured; password reset mail disabled");
            None
        }
    };

    let state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher: dispatcher.clone(),
        jwt_secret: config.jwt_secret.clone(),
        reset_secret: config.reset_secret.clone(),
        client_url: config.client_url.clone(),
        recommender: recommend::RecommenderClient::new(config.recommender_url.clone()),
        media: media::MediaStore::new(config.media_dir.clone(), config.media_base_url.clone()),
        google: google_oauth,
        calendar: calendar_client,
        mailer,
    });

    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Matinee server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/users/register", post(auth::register))
        .route("/api/users/login", post(auth::login))
        .route("/api/users/forgot-password", post(auth::forgot_password))
        .route("/api/users/reset-password", post(auth::reset_password))
        .route("/api/users/auth/google", get(google::google_auth))
        .route("/api/users/auth/google/callback", get(google::google_callback))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/users/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/api/users/logout", post(auth::logout))
        .route("/api/groups", post(groups::create_group).get(groups::list_groups))
        .route("/api/groups/join", post(groups::join_group))
        .route(
            "/api/groups/{group_id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/api/groups/{group_id}/members", put(groups::add_member))
        .route(
            "/api/groups/{group_id}/members/{user_id}",
            delete(groups::remove_member),
        )
        .route("/api/events", post(events::create_event).get(events::list_events))
        .route(
            "/api/events/{event_id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/api/events/{event_id}/invitees",
            post(events::add_invitees).delete(events::remove_invitee),
        )
        .route("/api/events/{event_id}/rsvp", put(events::rsvp))
        .route("/api/events/{event_id}/watched", post(events::mark_watched))
        .route("/api/events/{event_id}/messages", post(messages::send_message))
        .route("/api/events/{event_id}/feed", get(messages::get_feed))
        .route("/api/polls", post(polls::create_poll))
        .route("/api/polls/{poll_id}", get(polls::get_poll))
        .route("/api/polls/{poll_id}/vote", post(polls::vote))
        .route("/api/watchlist", post(watchlists::add_movie).get(watchlists::get_watchlist))
        .route("/api/watchlist/contains", get(watchlists::contains))
        .route("/api/watchlist/{movie_id}", delete(watchlists::remove_movie))
        .route(
            "/api/recommendations/group/{group_id}",
            get(recommend::group_recommendations),
        )
        .route("/api/media", post(media::upload_media))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(ws_route)
        .nest_service("/media", ServeDir::new(state.media.dir()))
        .layer(DefaultBodyLimit::max(media::MAX_BODY_SIZE))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher.clone(), state.jwt_secret.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn test_state() -> AppState {
        let media_dir = std::env::temp_dir().join(format!("matinee-router-{}", Uuid::new_v4()));
        Arc::new(AppStateInner {
            db: matinee_db::Database::open_in_memory().unwrap(),
            dispatcher: Dispatcher::new(),
            jwt_secret: "router-test-secret".to_string(),
            reset_secret: "router-test-reset".to_string(),
            client_url: "http://localhost:5173".to_string(),
            recommender: recommend::RecommenderClient::new("http://localhost:5001".to_string()),
            media: media::MediaStore::new(media_dir, "http://localhost:4000/media"),
            google: None,
            calendar: None,
            mailer: None,
        })
    }

    #[tokio::test]
    async fn media_upload_accepts_images_up_to_the_cap() {
        let state = test_state();
        let app = build_router(state.clone());
        let token = auth::create_token(&state.jwt_secret, Uuid::new_v4(), "tester").unwrap();

        // 3 MB JPEG, over axum's stock 2 MB extractor limit but under ours
        let mut jpeg = vec![0xFF, 0xD8, 0xFF];
        jpeg.resize(3 * 1024 * 1024, 0);

        let response = app
            .oneshot(
                Request::post("/api/media")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(jpeg))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn bodies_over_the_router_limit_are_rejected() {
        let state = test_state();
        let app = build_router(state.clone());
        let token = auth::create_token(&state.jwt_secret, Uuid::new_v4(), "tester").unwrap();

        let oversized = vec![0u8; media::MAX_BODY_SIZE + 1];

        let response = app
            .oneshot(
                Request::post("/api/media")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::from(oversized))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
