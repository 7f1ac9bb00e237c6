use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{DestinationId, DestinationKind, RoomId},
    Result,
};

const DESTINATION_COLUMNS: &str =
    "id, room_id, kind, name, config, is_enabled, created_at, updated_at";

/// A destination row as stored. The endpoint config is ciphertext; the
/// service layer decrypts it into a typed model.
#[derive(Debug, Clone)]
pub struct DestinationRecord {
    pub id: DestinationId,
    pub room_id: RoomId,
    pub kind: DestinationKind,
    pub name: String,
    pub config_ciphertext: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Destination repository for database operations
#[derive(Clone)]
pub struct DestinationRepository {
    pool: PgPool,
}

impl DestinationRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new destination
    pub async fn create(&self, record: &DestinationRecord) -> Result<DestinationRecord> {
        let row = sqlx::query(&format!(
            "INSERT INTO destinations (id, room_id, kind, name, config, is_enabled, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {DESTINATION_COLUMNS}"
        ))
        .bind(record.id.as_str())
        .bind(record.room_id.as_str())
        .bind(record.kind.as_str())
        .bind(&record.name)
        .bind(&record.config_ciphertext)
        .bind(record.is_enabled)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_one(&self.pool)
        .await?;

        row_to_record(&row)
    }

    /// Get destination by ID
    pub async fn get_by_id(&self, destination_id: &DestinationId) -> Result<Option<DestinationRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {DESTINATION_COLUMNS} FROM destinations WHERE id = $1"
        ))
        .bind(destination_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    /// List all destinations for a room
    pub async fn list_by_room(&self, room_id: &RoomId) -> Result<Vec<DestinationRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {DESTINATION_COLUMNS} FROM destinations
             WHERE room_id = $1
             ORDER BY created_at ASC"
        ))
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// List only enabled destinations for a room (go-live candidates)
    pub async fn list_enabled_by_room(&self, room_id: &RoomId) -> Result<Vec<DestinationRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {DESTINATION_COLUMNS} FROM destinations
             WHERE room_id = $1 AND is_enabled = TRUE
             ORDER BY created_at ASC"
        ))
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// Update name and config of a destination
    pub async fn update(
        &self,
        destination_id: &DestinationId,
        name: &str,
        config_ciphertext: &str,
    ) -> Result<DestinationRecord> {
        let row = sqlx::query(&format!(
            "UPDATE destinations
             SET name = $2, config = $3, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {DESTINATION_COLUMNS}"
        ))
        .bind(destination_id.as_str())
        .bind(name)
        .bind(config_ciphertext)
        .fetch_one(&self.pool)
        .await?;

        row_to_record(&row)
    }

    /// Flip the enabled flag, returning the updated record
    pub async fn toggle_enabled(&self, destination_id: &DestinationId) -> Result<DestinationRecord> {
        let row = sqlx::query(&format!(
            "UPDATE destinations
             SET is_enabled = NOT is_enabled, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {DESTINATION_COLUMNS}"
        ))
        .bind(destination_id.as_str())
        .fetch_one(&self.pool)
        .await?;

        row_to_record(&row)
    }

    /// Delete a destination
    pub async fn delete(&self, destination_id: &DestinationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM destinations WHERE id = $1")
            .bind(destination_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_record(row: &PgRow) -> Result<DestinationRecord> {
    let kind_str: String = row.try_get("kind")?;

    Ok(DestinationRecord {
        id: DestinationId::from_string(row.try_get("id")?),
        room_id: RoomId::from_string(row.try_get("room_id")?),
        kind: kind_str.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown destination kind: {kind_str}, defaulting to rtmp");
            DestinationKind::Rtmp
        }),
        name: row.try_get("name")?,
        config_ciphertext: row.try_get("config")?,
        is_enabled: row.try_get("is_enabled")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
