use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{Room, RoomId, RoomStatus, RoomWithCounts, UserId},
    Result,
};

const ROOM_COLUMNS: &str = "id, owner_id, name, slug, status, media_room_name, \
     is_streaming, streaming_egress_id, streaming_started_at, \
     is_recording, recording_egress_id, recording_started_at, \
     created_at, updated_at";

/// Room repository for database operations
#[derive(Clone)]
pub struct RoomRepository {
    pool: PgPool,
}

impl RoomRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new room using a provided executor (pool or transaction)
    pub async fn create_with_executor<'e, E>(&self, room: &Room, executor: E) -> Result<Room>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row = sqlx::query(&format!(
            "INSERT INTO rooms (id, owner_id, name, slug, status, media_room_name, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(room.id.as_str())
        .bind(room.owner_id.as_str())
        .bind(&room.name)
        .bind(&room.slug)
        .bind(status_to_i16(room.status))
        .bind(&room.media_room_name)
        .bind(room.created_at)
        .bind(room.updated_at)
        .fetch_one(executor)
        .await?;

        row_to_room(&row)
    }

    /// Get room by ID
    pub async fn get_by_id(&self, room_id: &RoomId) -> Result<Option<Room>> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
            .bind(room_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_room).transpose()
    }

    /// Get room by its public slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Room>> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_room).transpose()
    }

    /// Slugs starting with the given base, for collision suffixing.
    /// Slugs only contain `[a-z0-9-]`, so the LIKE pattern is safe.
    pub async fn list_slugs_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let slugs = sqlx::query_scalar("SELECT slug FROM rooms WHERE slug LIKE $1 || '%'")
            .bind(prefix)
            .fetch_all(&self.pool)
            .await?;

        Ok(slugs)
    }

    /// Rename a room
    pub async fn update_name(&self, room_id: &RoomId, name: &str) -> Result<Room> {
        let row = sqlx::query(&format!(
            "UPDATE rooms
             SET name = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(room_id.as_str())
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        row_to_room(&row)
    }

    /// Update room status
    pub async fn update_status(&self, room_id: &RoomId, status: RoomStatus) -> Result<Room> {
        let row = sqlx::query(&format!(
            "UPDATE rooms
             SET status = $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(room_id.as_str())
        .bind(status_to_i16(status))
        .fetch_one(&self.pool)
        .await?;

        row_to_room(&row)
    }

    /// Hard delete a room. Cascades to participants, destinations,
    /// recordings, and scenes.
    pub async fn delete(&self, room_id: &RoomId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List a user's rooms with participant/destination counts (dashboard view)
    pub async fn list_by_owner_with_counts(&self, owner_id: &UserId) -> Result<Vec<RoomWithCounts>> {
        let rows = sqlx::query(
            r"
            SELECT
                r.id, r.owner_id, r.name, r.slug, r.status, r.media_room_name,
                r.is_streaming, r.streaming_egress_id, r.streaming_started_at,
                r.is_recording, r.recording_egress_id, r.recording_started_at,
                r.created_at, r.updated_at,
                COALESCE(COUNT(DISTINCT p.id), 0)::int as participant_count,
                COALESCE(COUNT(DISTINCT d.id), 0)::int as destination_count
            FROM rooms r
            LEFT JOIN participants p ON r.id = p.room_id
            LEFT JOIN destinations d ON r.id = d.room_id
            WHERE r.owner_id = $1
            GROUP BY r.id
            ORDER BY r.created_at DESC
            ",
        )
        .bind(owner_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let participant_count: i32 = row.try_get("participant_count")?;
                let destination_count: i32 = row.try_get("destination_count")?;
                let room = row_to_room(&row)?;
                Ok(RoomWithCounts {
                    room,
                    participant_count,
                    destination_count,
                })
            })
            .collect()
    }

    /// Record that a streaming egress was started for this room
    pub async fn set_streaming(
        &self,
        room_id: &RoomId,
        egress_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<Room> {
        let row = sqlx::query(&format!(
            "UPDATE rooms
             SET is_streaming = TRUE, streaming_egress_id = $2, streaming_started_at = $3,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(room_id.as_str())
        .bind(egress_id)
        .bind(started_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_room(&row)
    }

    /// Clear streaming bookkeeping after the egress stops (or is lost)
    pub async fn clear_streaming(&self, room_id: &RoomId) -> Result<Room> {
        let row = sqlx::query(&format!(
            "UPDATE rooms
             SET is_streaming = FALSE, streaming_egress_id = NULL, streaming_started_at = NULL,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(room_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        row_to_room(&row)
    }

    /// Record that a recording egress was started for this room
    pub async fn set_recording(
        &self,
        room_id: &RoomId,
        egress_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<Room> {
        let row = sqlx::query(&format!(
            "UPDATE rooms
             SET is_recording = TRUE, recording_egress_id = $2, recording_started_at = $3,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(room_id.as_str())
        .bind(egress_id)
        .bind(started_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_room(&row)
    }

    /// Clear recording bookkeeping
    pub async fn clear_recording(&self, room_id: &RoomId) -> Result<Room> {
        let row = sqlx::query(&format!(
            "UPDATE rooms
             SET is_recording = FALSE, recording_egress_id = NULL, recording_started_at = NULL,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(room_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        row_to_room(&row)
    }
}

fn row_to_room(row: &PgRow) -> Result<Room> {
    let status_i16: i16 = row.try_get("status")?;

    Ok(Room {
        id: RoomId::from_string(row.try_get("id")?),
        owner_id: UserId::from_string(row.try_get("owner_id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        status: i16_to_status(status_i16),
        media_room_name: row.try_get("media_room_name")?,
        is_streaming: row.try_get("is_streaming")?,
        streaming_egress_id: row.try_get("streaming_egress_id")?,
        streaming_started_at: row.try_get("streaming_started_at")?,
        is_recording: row.try_get("is_recording")?,
        recording_egress_id: row.try_get("recording_egress_id")?,
        recording_started_at: row.try_get("recording_started_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

const fn status_to_i16(status: RoomStatus) -> i16 {
    match status {
        RoomStatus::Active => 1,
        RoomStatus::Ended => 2,
    }
}

fn i16_to_status(val: i16) -> RoomStatus {
    match val {
        1 => RoomStatus::Active,
        2 => RoomStatus::Ended,
        _ => {
            tracing::warn!("Unknown room status value: {val}, defaulting to Active");
            RoomStatus::Active
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_round_trip() {
        assert_eq!(i16_to_status(status_to_i16(RoomStatus::Active)), RoomStatus::Active);
        assert_eq!(i16_to_status(status_to_i16(RoomStatus::Ended)), RoomStatus::Ended);
        assert_eq!(i16_to_status(99), RoomStatus::Active);
    }
}
