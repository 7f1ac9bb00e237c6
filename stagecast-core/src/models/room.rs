use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RoomId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Active,
    Ended,
}

impl RoomStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A studio room. Streaming/recording fields mirror the state of remote
/// egress jobs; they are bookkeeping only and carry no consistency guarantee
/// against the media service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub owner_id: UserId,
    pub name: String,
    pub slug: String,
    pub status: RoomStatus,
    /// Room name in the external video infrastructure (equals the slug)
    pub media_room_name: String,
    pub is_streaming: bool,
    pub streaming_egress_id: Option<String>,
    pub streaming_started_at: Option<DateTime<Utc>>,
    pub is_recording: bool,
    pub recording_egress_id: Option<String>,
    pub recording_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(owner_id: UserId, name: String, slug: String) -> Self {
        let now = Utc::now();
        let media_room_name = slug.clone();
        Self {
            id: RoomId::new(),
            owner_id,
            name,
            slug,
            status: RoomStatus::Active,
            media_room_name,
            is_streaming: false,
            streaming_egress_id: None,
            streaming_started_at: None,
            is_recording: false,
            recording_egress_id: None,
            recording_started_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether any egress (streaming or recording) is locally marked active
    pub fn has_active_egress(&self) -> bool {
        self.is_streaming || self.is_recording
    }

    pub fn streaming_duration(&self) -> Option<i64> {
        if !self.is_streaming {
            return None;
        }
        self.streaming_started_at
            .map(|started| (Utc::now() - started).num_seconds())
    }

    pub fn recording_duration(&self) -> Option<i64> {
        if !self.is_recording {
            return None;
        }
        self.recording_started_at
            .map(|started| (Utc::now() - started).num_seconds())
    }
}

/// Room with participant/destination counts (for dashboard listings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomWithCounts {
    #[serde(flatten)]
    pub room: Room,
    pub participant_count: i32,
    pub destination_count: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_room_has_no_active_egress() {
        let room = Room::new(UserId::new(), "My Show".to_string(), "my-show".to_string());
        assert!(!room.has_active_egress());
        assert_eq!(room.media_room_name, "my-show");
        assert!(room.streaming_duration().is_none());
        assert!(room.recording_duration().is_none());
    }

    #[test]
    fn test_streaming_duration_requires_flag_and_timestamp() {
        let mut room = Room::new(UserId::new(), "a".to_string(), "a".to_string());
        room.streaming_started_at = Some(Utc::now() - chrono::Duration::seconds(90));

        // Timestamp alone is not enough
        assert!(room.streaming_duration().is_none());

        room.is_streaming = true;
        let duration = room.streaming_duration().expect("duration");
        assert!(duration >= 90);
        assert!(room.has_active_egress());
    }
}
