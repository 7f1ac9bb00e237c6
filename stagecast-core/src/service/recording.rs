use chrono::Utc;

use crate::models::{Recording, RoomId};
use crate::repository::RecordingRepository;
use crate::service::egress::EgressStopped;
use crate::Result;

/// Recording bookkeeping: one row per egress job that produces a file
#[derive(Clone)]
pub struct RecordingService {
    recordings: RecordingRepository,
}

impl RecordingService {
    pub fn new(recordings: RecordingRepository) -> Self {
        Self { recordings }
    }

    /// Open a recording row when a file-producing egress starts
    pub async fn start(&self, room_id: &RoomId, egress_id: &str) -> Result<Recording> {
        self.recordings
            .create(&Recording::started(room_id.clone(), egress_id.to_string()))
            .await
    }

    /// Close the recording row tracking an egress, filling in file info
    /// from the stop response when available. Missing rows are ignored.
    pub async fn finish_by_egress(
        &self,
        egress_id: &str,
        stopped: Option<&EgressStopped>,
    ) -> Result<Option<Recording>> {
        let Some(recording) = self.recordings.get_by_egress_id(egress_id).await? else {
            return Ok(None);
        };

        let file = stopped.and_then(|s| s.file_results.first());
        let file_url = file.and_then(|f| f.file_url());
        let file_size = file.and_then(|f| f.size);

        let finished = self
            .recordings
            .finish(&recording.id, file_url.as_deref(), file_size, Utc::now())
            .await?;

        Ok(Some(finished))
    }

    pub async fn list(&self, room_id: &RoomId) -> Result<Vec<Recording>> {
        self.recordings.list_by_room(room_id).await
    }
}
