use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{Recording, RecordingId, RoomId},
    Result,
};

const RECORDING_COLUMNS: &str = "id, room_id, kind, egress_id, file_url, file_size, \
     started_at, ended_at, created_at, updated_at";

/// Recording repository for database operations
#[derive(Clone)]
pub struct RecordingRepository {
    pool: PgPool,
}

impl RecordingRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a recording row when an egress starts
    pub async fn create(&self, recording: &Recording) -> Result<Recording> {
        let row = sqlx::query(&format!(
            "INSERT INTO recordings (id, room_id, kind, egress_id, file_url, file_size, started_at, ended_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {RECORDING_COLUMNS}"
        ))
        .bind(recording.id.as_str())
        .bind(recording.room_id.as_str())
        .bind(&recording.kind)
        .bind(&recording.egress_id)
        .bind(&recording.file_url)
        .bind(recording.file_size)
        .bind(recording.started_at)
        .bind(recording.ended_at)
        .bind(recording.created_at)
        .bind(recording.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_recording(&row)
    }

    /// Get recording by ID
    pub async fn get_by_id(&self, recording_id: &RecordingId) -> Result<Option<Recording>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings WHERE id = $1"
        ))
        .bind(recording_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_recording).transpose()
    }

    /// Find the recording tracking a given egress job
    pub async fn get_by_egress_id(&self, egress_id: &str) -> Result<Option<Recording>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings
             WHERE egress_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(egress_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_recording).transpose()
    }

    /// List recordings for a room, newest first
    pub async fn list_by_room(&self, room_id: &RoomId) -> Result<Vec<Recording>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings
             WHERE room_id = $1
             ORDER BY created_at DESC"
        ))
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_recording).collect()
    }

    /// Close out a recording when its egress stops
    pub async fn finish(
        &self,
        recording_id: &RecordingId,
        file_url: Option<&str>,
        file_size: Option<i64>,
        ended_at: DateTime<Utc>,
    ) -> Result<Recording> {
        let row = sqlx::query(&format!(
            "UPDATE recordings
             SET file_url = COALESCE($2, file_url), file_size = COALESCE($3, file_size),
                 ended_at = $4, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {RECORDING_COLUMNS}"
        ))
        .bind(recording_id.as_str())
        .bind(file_url)
        .bind(file_size)
        .bind(ended_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_recording(&row)
    }
}

fn row_to_recording(row: &PgRow) -> Result<Recording> {
    Ok(Recording {
        id: RecordingId::from_string(row.try_get("id")?),
        room_id: RoomId::from_string(row.try_get("room_id")?),
        kind: row.try_get("kind")?,
        egress_id: row.try_get("egress_id")?,
        file_url: row.try_get("file_url")?,
        file_size: row.try_get("file_size")?,
        started_at: row.try_get("started_at")?,
        ended_at: row.try_get("ended_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
