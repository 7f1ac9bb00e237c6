//! Recording listings for a room

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use stagecast_core::models::{Recording, RoomId};

use super::{AppResult, AppState, AuthUser};

#[derive(Debug, Serialize)]
pub struct RecordingEntry {
    #[serde(flatten)]
    pub recording: Recording,
    pub duration: Option<i64>,
    pub in_progress: bool,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
) -> AppResult<Json<Vec<RecordingEntry>>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    let recordings = state.recording_service.list(&room.id).await?;

    let entries = recordings
        .into_iter()
        .map(|recording| RecordingEntry {
            duration: recording.duration(),
            in_progress: recording.is_in_progress(),
            recording,
        })
        .collect();

    Ok(Json(entries))
}
