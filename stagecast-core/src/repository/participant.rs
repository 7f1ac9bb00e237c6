use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{Participant, ParticipantId, ParticipantRole, RoomId},
    Result,
};

const PARTICIPANT_COLUMNS: &str = "id, room_id, name, role, token, media_identity, \
     is_connected, joined_at, left_at, created_at, updated_at";

/// Participant repository for database operations
#[derive(Clone)]
pub struct ParticipantRepository {
    pool: PgPool,
}

impl ParticipantRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new participant (invite)
    pub async fn create(&self, participant: &Participant) -> Result<Participant> {
        let row = sqlx::query(&format!(
            "INSERT INTO participants (id, room_id, name, role, token, media_identity, is_connected, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {PARTICIPANT_COLUMNS}"
        ))
        .bind(participant.id.as_str())
        .bind(participant.room_id.as_str())
        .bind(&participant.name)
        .bind(participant.role.as_str())
        .bind(&participant.token)
        .bind(&participant.media_identity)
        .bind(participant.is_connected)
        .bind(participant.created_at)
        .bind(participant.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_participant(&row)
    }

    /// Get participant by ID
    pub async fn get_by_id(&self, participant_id: &ParticipantId) -> Result<Option<Participant>> {
        let row = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE id = $1"
        ))
        .bind(participant_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_participant).transpose()
    }

    /// Look up a participant by their invite token within a room
    pub async fn get_by_room_and_token(
        &self,
        room_id: &RoomId,
        token: &str,
    ) -> Result<Option<Participant>> {
        let row = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE room_id = $1 AND token = $2"
        ))
        .bind(room_id.as_str())
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_participant).transpose()
    }

    /// List all participants in a room, hosts first
    pub async fn list_by_room(&self, room_id: &RoomId) -> Result<Vec<Participant>> {
        let rows = sqlx::query(&format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM participants
             WHERE room_id = $1
             ORDER BY CASE WHEN role = 'host' THEN 0 ELSE 1 END, created_at ASC"
        ))
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_participant).collect()
    }

    /// Check whether an invite token is already in use (tokens are globally unique)
    pub async fn token_exists(&self, token: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM participants WHERE token = $1")
            .bind(token)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Mark a participant as connected to the media room
    pub async fn mark_connected(&self, participant_id: &ParticipantId) -> Result<Participant> {
        let row = sqlx::query(&format!(
            "UPDATE participants
             SET is_connected = TRUE, joined_at = COALESCE(joined_at, CURRENT_TIMESTAMP),
                 left_at = NULL, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {PARTICIPANT_COLUMNS}"
        ))
        .bind(participant_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        row_to_participant(&row)
    }

    /// Mark a participant as disconnected
    pub async fn mark_disconnected(&self, participant_id: &ParticipantId) -> Result<Participant> {
        let row = sqlx::query(&format!(
            "UPDATE participants
             SET is_connected = FALSE, left_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {PARTICIPANT_COLUMNS}"
        ))
        .bind(participant_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        row_to_participant(&row)
    }

    /// Remove a participant from a room
    pub async fn delete(&self, participant_id: &ParticipantId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(participant_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_participant(row: &PgRow) -> Result<Participant> {
    let role_str: String = row.try_get("role")?;

    Ok(Participant {
        id: ParticipantId::from_string(row.try_get("id")?),
        room_id: RoomId::from_string(row.try_get("room_id")?),
        name: row.try_get("name")?,
        role: role_str.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown participant role: {role_str}, defaulting to guest");
            ParticipantRole::Guest
        }),
        token: row.try_get("token")?,
        media_identity: row.try_get("media_identity")?,
        is_connected: row.try_get("is_connected")?,
        joined_at: row.try_get("joined_at")?,
        left_at: row.try_get("left_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
