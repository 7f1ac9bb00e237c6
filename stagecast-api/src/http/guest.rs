//! Public guest join flow: no session auth, the invite token is the credential

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use stagecast_core::service::ConnectedParticipant;

use stagecast_core::models::Room;

use super::{AppError, AppResult, AppState};

/// Ended rooms are not joinable
fn require_active(room: &Room) -> Result<(), AppError> {
    if room.status.is_active() {
        Ok(())
    } else {
        Err(AppError::bad_request("This room has ended"))
    }
}

#[derive(Debug, Serialize)]
pub struct JoinPayload {
    pub room: RoomSummary,
    pub participant: ParticipantSummary,
}

#[derive(Debug, Serialize)]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct ParticipantSummary {
    pub id: String,
    pub name: String,
    pub role: String,
    pub token: String,
}

pub async fn join(
    State(state): State<AppState>,
    Path((slug, token)): Path<(String, String)>,
) -> AppResult<Json<JoinPayload>> {
    let room = state.room_service.get_room_by_slug(&slug).await?;
    require_active(&room)?;
    let participant = state.participant_service.get_by_token(&room, &token).await?;

    Ok(Json(JoinPayload {
        room: RoomSummary {
            id: room.id.to_string(),
            name: room.name,
            slug: room.slug,
        },
        participant: ParticipantSummary {
            id: participant.id.to_string(),
            name: participant.name,
            role: participant.role.to_string(),
            token: participant.token,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct GuestMediaTokenRequest {
    pub participant_token: String,
}

/// Exchange an invite token for a media access token and mark the
/// participant connected.
pub async fn media_token(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<GuestMediaTokenRequest>,
) -> AppResult<Json<ConnectedParticipant>> {
    let room = state.room_service.get_room_by_slug(&slug).await?;
    require_active(&room)?;
    let connection = state
        .participant_service
        .connect(&room, &req.participant_token)
        .await?;
    Ok(Json(connection))
}

/// Mark the participant as having left the room
pub async fn leave(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(req): Json<GuestMediaTokenRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let room = state.room_service.get_room_by_slug(&slug).await?;
    state
        .participant_service
        .disconnect(&room, &req.participant_token)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
