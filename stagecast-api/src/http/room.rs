//! Room CRUD, the studio payload, invites, and host-side token exchange

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use stagecast_core::models::{
    Destination, Participant, ParticipantId, ParticipantRole, Room, RoomId, RoomWithCounts, Scene,
};
use stagecast_core::service::ConnectedParticipant;

use super::{AppResult, AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRoomRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MediaTokenRequest {
    pub participant_token: String,
}

/// Everything the studio page needs in one payload
#[derive(Debug, Serialize)]
pub struct StudioPayload {
    pub room: Room,
    pub participants: Vec<Participant>,
    pub destinations: Vec<Destination>,
    pub scenes: Vec<Scene>,
    pub active_scene: Option<Scene>,
    pub host_participant_token: String,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<RoomWithCounts>>> {
    let rooms = state.room_service.list_rooms(&auth.user_id).await?;
    Ok(Json(rooms))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateRoomRequest>,
) -> AppResult<(StatusCode, Json<Room>)> {
    let room = state.room_service.create_room(&auth.user_id, &req.name).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

pub async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
) -> AppResult<Json<StudioPayload>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    let owner = state.user_service.get_by_id(&auth.user_id).await?;

    // The owner's host participant is created on first studio view
    let host = state.participant_service.ensure_host(&room, &owner.name).await?;

    let participants = state.participant_service.list(&room).await?;
    let destinations = state.destination_service.list(&room.id).await?;
    let scenes = state.room_service.list_scenes(&room.id).await?;
    let active_scene = state.room_service.active_scene(&room.id).await?;

    Ok(Json(StudioPayload {
        room,
        participants,
        destinations,
        scenes,
        active_scene,
        host_participant_token: host.token,
    }))
}

pub async fn rename(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
    Json(req): Json<RenameRoomRequest>,
) -> AppResult<Json<Room>> {
    state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    let room = state.room_service.rename_room(&room_id, &req.name).await?;
    Ok(Json(room))
}

pub async fn end(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
) -> AppResult<Json<Room>> {
    state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    let room = state.room_service.end_room(&room_id).await?;
    Ok(Json(room))
}

pub async fn destroy(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
) -> AppResult<StatusCode> {
    state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    state.room_service.delete_room(&room_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub token: String,
    pub participant: Participant,
}

pub async fn invite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
    Json(req): Json<InviteRequest>,
) -> AppResult<(StatusCode, Json<InviteResponse>)> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;

    let role = match req.role.as_deref() {
        Some(role) => role
            .parse::<ParticipantRole>()
            .map_err(super::AppError::bad_request)?,
        None => ParticipantRole::Guest,
    };

    let participant = state.participant_service.invite(&room, &req.name, role).await?;

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            token: participant.token.clone(),
            participant,
        }),
    ))
}

pub async fn remove_participant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((room_id, participant_id)): Path<(RoomId, ParticipantId)>,
) -> AppResult<StatusCode> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    state
        .participant_service
        .remove(&room, &participant_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Host-side exchange of an invite token for a media access token.
/// Does not mark the participant connected.
pub async fn media_token(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
    Json(req): Json<MediaTokenRequest>,
) -> AppResult<Json<ConnectedParticipant>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;
    let connection = state
        .participant_service
        .mint_media_token(&room, &req.participant_token)
        .await?;
    Ok(Json(connection))
}
