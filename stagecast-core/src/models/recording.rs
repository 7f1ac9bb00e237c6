use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RecordingId, RoomId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: RecordingId,
    pub room_id: RoomId,
    pub kind: String,
    pub egress_id: Option<String>,
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Recording {
    pub fn started(room_id: RoomId, egress_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: RecordingId::new(),
            room_id,
            kind: "program".to_string(),
            egress_id: Some(egress_id),
            file_url: None,
            file_size: None,
            started_at: Some(now),
            ended_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.started_at.is_some() && self.ended_at.is_none()
    }

    pub fn duration(&self) -> Option<i64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_recording_is_in_progress() {
        let rec = Recording::started(RoomId::new(), "EG_123".to_string());
        assert!(rec.is_in_progress());
        assert!(rec.duration().is_none());
    }

    #[test]
    fn test_duration_after_end() {
        let mut rec = Recording::started(RoomId::new(), "EG_123".to_string());
        rec.started_at = Some(Utc::now() - chrono::Duration::seconds(120));
        rec.ended_at = Some(Utc::now());
        assert!(!rec.is_in_progress());
        assert!(rec.duration().unwrap() >= 120);
    }
}
