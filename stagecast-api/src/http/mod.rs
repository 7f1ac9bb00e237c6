// Module: http
// JSON REST API for the studio dashboard and guest join flow

pub mod auth;
pub mod destination;
pub mod egress;
pub mod error;
pub mod guest;
pub mod health;
pub mod middleware;
pub mod recording;
pub mod room;
pub mod scene;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use stagecast_core::service::{
    DestinationService, EgressClient, ParticipantService, RecordingService, RoomService,
    UserService,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};
pub use middleware::AuthUser;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub user_service: Arc<UserService>,
    pub room_service: Arc<RoomService>,
    pub participant_service: Arc<ParticipantService>,
    pub destination_service: Arc<DestinationService>,
    pub recording_service: Arc<RecordingService>,
    pub egress_client: Arc<EgressClient>,
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/user/me", get(auth::me))
        // Rooms
        .route("/api/rooms", get(room::list).post(room::create))
        .route(
            "/api/rooms/{room_id}",
            get(room::show).patch(room::rename).delete(room::destroy),
        )
        .route("/api/rooms/{room_id}/end", post(room::end))
        .route("/api/rooms/{room_id}/invite", post(room::invite))
        .route(
            "/api/rooms/{room_id}/participants/{participant_id}",
            delete(room::remove_participant),
        )
        .route("/api/rooms/{room_id}/media-token", post(room::media_token))
        // Guest join (public)
        .route("/api/join/{slug}/{token}", get(guest::join))
        .route("/api/join/{slug}/media-token", post(guest::media_token))
        .route("/api/join/{slug}/leave", post(guest::leave))
        // Destinations
        .route(
            "/api/rooms/{room_id}/destinations",
            get(destination::list).post(destination::create),
        )
        .route(
            "/api/rooms/{room_id}/destinations/{destination_id}",
            patch(destination::update).delete(destination::destroy),
        )
        .route(
            "/api/rooms/{room_id}/destinations/{destination_id}/toggle",
            post(destination::toggle),
        )
        // Egress
        .route("/api/rooms/{room_id}/stream/start", post(egress::start_streaming))
        .route("/api/rooms/{room_id}/stream/stop", post(egress::stop_streaming))
        .route("/api/rooms/{room_id}/record/start", post(egress::start_recording))
        .route("/api/rooms/{room_id}/record/stop", post(egress::stop_recording))
        .route("/api/rooms/{room_id}/go-live", post(egress::go_live))
        .route("/api/rooms/{room_id}/egress/status", get(egress::status))
        // Recordings
        .route("/api/rooms/{room_id}/recordings", get(recording::list))
        // Scenes
        .route("/api/rooms/{room_id}/scenes", post(scene::create))
        .route(
            "/api/rooms/{room_id}/scenes/{scene_id}/activate",
            post(scene::activate),
        )
        .route(
            "/api/rooms/{room_id}/scenes/{scene_id}",
            delete(scene::destroy),
        )
        // Probes
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
