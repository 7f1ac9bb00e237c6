//! RTMP destination management. Stream keys go in, but never come back out
//! in responses.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use stagecast_core::models::{Destination, DestinationConfig, DestinationId, DestinationKind, RoomId};

use super::{AppError, AppResult, AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub struct CreateDestinationRequest {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub rtmp_url: Option<String>,
    #[serde(default)]
    pub stream_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDestinationRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rtmp_url: Option<String>,
    #[serde(default)]
    pub stream_key: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
) -> AppResult<Json<Vec<Destination>>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    let destinations = state.destination_service.list(&room.id).await?;
    Ok(Json(destinations))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
    Json(req): Json<CreateDestinationRequest>,
) -> AppResult<(StatusCode, Json<Destination>)> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;

    let kind = req
        .kind
        .parse::<DestinationKind>()
        .map_err(AppError::bad_request)?;
    let config = DestinationConfig {
        url: req.rtmp_url,
        key: req.stream_key,
    };

    let destination = state
        .destination_service
        .create(&room.id, kind, &req.name, config)
        .await?;

    Ok((StatusCode::CREATED, Json(destination)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((room_id, destination_id)): Path<(RoomId, DestinationId)>,
    Json(req): Json<UpdateDestinationRequest>,
) -> AppResult<Json<Destination>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    let destination = state
        .destination_service
        .update(
            &room.id,
            &destination_id,
            req.name.as_deref(),
            req.rtmp_url,
            req.stream_key,
        )
        .await?;
    Ok(Json(destination))
}

pub async fn toggle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((room_id, destination_id)): Path<(RoomId, DestinationId)>,
) -> AppResult<Json<Destination>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    let destination = state
        .destination_service
        .toggle(&room.id, &destination_id)
        .await?;
    Ok(Json(destination))
}

pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((room_id, destination_id)): Path<(RoomId, DestinationId)>,
) -> AppResult<StatusCode> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    state
        .destination_service
        .delete(&room.id, &destination_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
