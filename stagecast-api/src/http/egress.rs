//! Egress orchestration: start/stop streaming and recording, go-live, status.
//!
//! Stop paths are deliberately forgiving: when the remote stop fails the
//! local flags are cleared anyway and the response carries a warning,
//! because the job may already be gone on the remote side.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use stagecast_core::models::{Room, RoomId};
use stagecast_core::service::EgressStopped;

use super::{AppError, AppResult, AppState, AuthUser};

const DEFAULT_LAYOUT: &str = "grid";

#[derive(Debug, Default, Deserialize)]
pub struct LayoutRequest {
    #[serde(default)]
    pub layout: Option<String>,
}

impl LayoutRequest {
    fn layout(&self) -> &str {
        self.layout.as_deref().unwrap_or(DEFAULT_LAYOUT)
    }
}

pub async fn start_streaming(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
    body: Option<Json<LayoutRequest>>,
) -> AppResult<Json<JsonValue>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;

    if room.is_streaming {
        return Err(AppError::bad_request(format!(
            "Room is already streaming (egress {})",
            room.streaming_egress_id.as_deref().unwrap_or("unknown")
        )));
    }

    let destinations = state.destination_service.list_enabled(&room.id).await?;
    if destinations.is_empty() {
        return Err(AppError::bad_request(
            "No enabled destinations configured. Add at least one streaming destination.",
        ));
    }

    let layout = body.unwrap_or_default().layout().to_string();
    let started = state
        .egress_client
        .start_streaming(&room.media_room_name, &destinations, &layout)
        .await?;

    state
        .room_service
        .mark_streaming_started(&room.id, &started.egress_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "egress_id": started.egress_id,
        "status": started.status,
        "message": "Streaming started successfully",
    })))
}

pub async fn stop_streaming(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
) -> AppResult<Json<JsonValue>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;

    let Some(egress_id) = streaming_egress_id(&room) else {
        return Err(AppError::bad_request("Room is not currently streaming"));
    };

    let result = state.egress_client.stop_egress(&egress_id).await;
    if let Err(e) = &result {
        tracing::error!(room_id = %room.id, %egress_id, error = %e, "Failed to stop streaming");
    }
    let (_, payload) =
        stop_outcome(result, "Streaming stopped successfully", "Streaming state cleared");

    state.room_service.mark_streaming_stopped(&room.id).await?;
    Ok(Json(payload))
}

pub async fn start_recording(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
    body: Option<Json<LayoutRequest>>,
) -> AppResult<Json<JsonValue>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;

    if room.is_recording {
        return Err(AppError::bad_request(format!(
            "Room is already recording (egress {})",
            room.recording_egress_id.as_deref().unwrap_or("unknown")
        )));
    }

    let layout = body.unwrap_or_default().layout().to_string();
    let started = state
        .egress_client
        .start_recording(&room.media_room_name, &room.slug, &layout)
        .await?;

    state
        .room_service
        .mark_recording_started(&room.id, &started.egress_id)
        .await?;
    let recording = state
        .recording_service
        .start(&room.id, &started.egress_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "egress_id": started.egress_id,
        "recording_id": recording.id,
        "status": started.status,
        "message": "Recording started successfully",
    })))
}

pub async fn stop_recording(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
) -> AppResult<Json<JsonValue>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;

    let Some(egress_id) = recording_egress_id(&room) else {
        return Err(AppError::bad_request("Room is not currently recording"));
    };

    let result = state.egress_client.stop_egress(&egress_id).await;
    if let Err(e) = &result {
        tracing::error!(room_id = %room.id, %egress_id, error = %e, "Failed to stop recording");
    }
    let (stopped, mut payload) =
        stop_outcome(result, "Recording stopped successfully", "Recording state cleared");

    // A failed remote stop still closes the recording row, without file info
    let recording = state
        .recording_service
        .finish_by_egress(&egress_id, stopped.as_ref())
        .await?;
    state.room_service.mark_recording_stopped(&room.id).await?;
    payload["recording_id"] = json!(recording.map(|r| r.id));

    Ok(Json(payload))
}

/// Shape the response body for a stop request. A remote failure is not
/// fatal: the job may already be gone on the remote side, so the caller
/// clears local state either way and the body carries a warning instead
/// of an error. The stopped result is handed back for file bookkeeping.
fn stop_outcome(
    result: Result<EgressStopped, stagecast_core::Error>,
    stopped_message: &str,
    cleared_message: &str,
) -> (Option<EgressStopped>, JsonValue) {
    match result {
        Ok(stopped) => {
            let payload = json!({
                "success": true,
                "egress_id": stopped.egress_id,
                "status": stopped.status,
                "message": stopped_message,
            });
            (Some(stopped), payload)
        }
        Err(e) => {
            let payload = json!({
                "success": true,
                "message": cleared_message,
                "warning": e.to_string(),
            });
            (None, payload)
        }
    }
}

/// Start streaming and recording in a single egress job. Streaming flags
/// are only set when enabled destinations exist; recording always starts.
pub async fn go_live(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
    body: Option<Json<LayoutRequest>>,
) -> AppResult<Json<JsonValue>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;

    if room.has_active_egress() {
        return Err(AppError::bad_request(
            "Room already has active streaming or recording",
        ));
    }

    let destinations = state.destination_service.list_enabled(&room.id).await?;
    let layout = body.unwrap_or_default().layout().to_string();

    let started = state
        .egress_client
        .start_streaming_and_recording(&room.media_room_name, &room.slug, &destinations, &layout)
        .await?;

    if !destinations.is_empty() {
        state
            .room_service
            .mark_streaming_started(&room.id, &started.egress_id)
            .await?;
    }
    state
        .room_service
        .mark_recording_started(&room.id, &started.egress_id)
        .await?;
    let recording = state
        .recording_service
        .start(&room.id, &started.egress_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "egress_id": started.egress_id,
        "recording_id": recording.id,
        "status": started.status,
        "message": "Streaming and recording started successfully",
    })))
}

/// Local bookkeeping plus a best-effort live listing from the remote side
pub async fn status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(room_id): Path<RoomId>,
) -> AppResult<Json<JsonValue>> {
    let room = state.room_service.get_owned_room(&room_id, &auth.user_id).await?;

    let mut payload = json!({
        "is_streaming": room.is_streaming,
        "streaming_egress_id": room.streaming_egress_id,
        "streaming_started_at": room.streaming_started_at,
        "streaming_duration": room.streaming_duration(),
        "is_recording": room.is_recording,
        "recording_egress_id": room.recording_egress_id,
        "recording_started_at": room.recording_started_at,
        "recording_duration": room.recording_duration(),
    });

    match state
        .egress_client
        .list_egress(Some(&room.media_room_name), true)
        .await
    {
        Ok(items) => {
            payload["active_egresses"] = json!(items);
        }
        Err(e) => {
            tracing::warn!(room_id = %room.id, error = %e, "Could not fetch live egress status");
            payload["active_egresses"] = json!([]);
            payload["warning"] = json!("Could not fetch live egress status");
        }
    }

    Ok(Json(payload))
}

fn streaming_egress_id(room: &Room) -> Option<String> {
    if !room.is_streaming {
        return None;
    }
    room.streaming_egress_id.clone()
}

fn recording_egress_id(room: &Room) -> Option<String> {
    if !room.is_recording {
        return None;
    }
    room.recording_egress_id.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecast_core::Error;

    fn stopped(egress_id: &str) -> EgressStopped {
        EgressStopped {
            egress_id: egress_id.to_string(),
            status: "EGRESS_COMPLETE".to_string(),
            file_results: vec![],
            stream_results: vec![],
        }
    }

    #[test]
    fn test_stop_outcome_reports_remote_result() {
        let (result, payload) = stop_outcome(
            Ok(stopped("EG_1")),
            "Streaming stopped successfully",
            "Streaming state cleared",
        );
        assert!(result.is_some());
        assert_eq!(payload["success"], json!(true));
        assert_eq!(payload["egress_id"], json!("EG_1"));
        assert_eq!(payload["status"], json!("EGRESS_COMPLETE"));
        assert_eq!(payload["message"], json!("Streaming stopped successfully"));
        assert!(payload.get("warning").is_none());
    }

    #[test]
    fn test_stop_outcome_remote_failure_still_succeeds_with_warning() {
        let (result, payload) = stop_outcome(
            Err(Error::Upstream("egress EG_1 does not exist".to_string())),
            "Recording stopped successfully",
            "Recording state cleared",
        );
        // No stopped result: the caller closes the recording row without
        // file info and clears the flags anyway
        assert!(result.is_none());
        assert_eq!(payload["success"], json!(true));
        assert_eq!(payload["message"], json!("Recording state cleared"));
        assert!(payload["warning"]
            .as_str()
            .unwrap()
            .contains("egress EG_1 does not exist"));
        assert!(payload.get("egress_id").is_none());
    }
}
