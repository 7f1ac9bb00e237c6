use sqlx::{postgres::PgRow, PgPool, Row};

use crate::{
    models::{RoomId, Scene, SceneId, SceneLayout},
    Error, Result,
};

const SCENE_COLUMNS: &str = "id, room_id, layout, overlays, is_active, created_at, updated_at";

/// Scene repository for database operations
#[derive(Clone)]
pub struct SceneRepository {
    pool: PgPool,
}

impl SceneRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a scene using a provided executor (pool or transaction)
    pub async fn create_with_executor<'e, E>(&self, scene: &Scene, executor: E) -> Result<Scene>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row = sqlx::query(&format!(
            "INSERT INTO scenes (id, room_id, layout, overlays, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SCENE_COLUMNS}"
        ))
        .bind(scene.id.as_str())
        .bind(scene.room_id.as_str())
        .bind(scene.layout.as_str())
        .bind(&scene.overlays)
        .bind(scene.is_active)
        .bind(scene.created_at)
        .bind(scene.updated_at)
        .fetch_one(executor)
        .await?;

        row_to_scene(&row)
    }

    /// Get scene by ID
    pub async fn get_by_id(&self, scene_id: &SceneId) -> Result<Option<Scene>> {
        let row = sqlx::query(&format!("SELECT {SCENE_COLUMNS} FROM scenes WHERE id = $1"))
            .bind(scene_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_scene).transpose()
    }

    /// List scenes in a room, oldest first
    pub async fn list_by_room(&self, room_id: &RoomId) -> Result<Vec<Scene>> {
        let rows = sqlx::query(&format!(
            "SELECT {SCENE_COLUMNS} FROM scenes
             WHERE room_id = $1
             ORDER BY created_at ASC"
        ))
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_scene).collect()
    }

    /// Get the currently active scene in a room
    pub async fn get_active_by_room(&self, room_id: &RoomId) -> Result<Option<Scene>> {
        let row = sqlx::query(&format!(
            "SELECT {SCENE_COLUMNS} FROM scenes
             WHERE room_id = $1 AND is_active = TRUE
             LIMIT 1"
        ))
        .bind(room_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_scene).transpose()
    }

    /// Make one scene active and all others in the room inactive.
    /// Runs in a transaction so the room never observably has two active
    /// scenes or none.
    pub async fn activate(&self, room_id: &RoomId, scene_id: &SceneId) -> Result<Scene> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE scenes SET is_active = FALSE, updated_at = CURRENT_TIMESTAMP
             WHERE room_id = $1 AND is_active = TRUE AND id <> $2",
        )
        .bind(room_id.as_str())
        .bind(scene_id.as_str())
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!(
            "UPDATE scenes SET is_active = TRUE, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND room_id = $2
             RETURNING {SCENE_COLUMNS}"
        ))
        .bind(scene_id.as_str())
        .bind(room_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Err(Error::NotFound("Scene not found".to_string()));
        };

        let scene = row_to_scene(&row)?;
        tx.commit().await?;

        Ok(scene)
    }

    /// Delete a scene
    pub async fn delete(&self, scene_id: &SceneId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM scenes WHERE id = $1")
            .bind(scene_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_scene(row: &PgRow) -> Result<Scene> {
    let layout_str: String = row.try_get("layout")?;

    Ok(Scene {
        id: SceneId::from_string(row.try_get("id")?),
        room_id: RoomId::from_string(row.try_get("room_id")?),
        layout: layout_str.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown scene layout: {layout_str}, defaulting to solo");
            SceneLayout::Solo
        }),
        overlays: row.try_get("overlays")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
