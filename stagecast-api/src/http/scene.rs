//! Scene management: compositor layouts with overlay lists

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use stagecast_core::models::{RoomId, Scene, SceneId, SceneLayout};

use super::{AppError, AppResult, AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub struct CreateSceneRequest {
    pub layout: String,
    #[serde(default = "empty_overlays")]
    pub overlays: JsonValue,
}

fn empty_overlays() -> JsonValue {
    JsonValue::Array(Vec::new())
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
    Json(req): Json<CreateSceneRequest>,
) -> AppResult<(StatusCode, Json<Scene>)> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;

    let layout = req
        .layout
        .parse::<SceneLayout>()
        .map_err(AppError::bad_request)?;
    let scene = state
        .room_service
        .create_scene(&room.id, layout, req.overlays)
        .await?;

    Ok((StatusCode::CREATED, Json(scene)))
}

pub async fn activate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((room_id, scene_id)): Path<(RoomId, SceneId)>,
) -> AppResult<Json<Scene>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    let scene = state.room_service.activate_scene(&room.id, &scene_id).await?;
    Ok(Json(scene))
}

pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((room_id, scene_id)): Path<(RoomId, SceneId)>,
) -> AppResult<StatusCode> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    state.room_service.delete_scene(&room.id, &scene_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
