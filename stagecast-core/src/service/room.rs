use sqlx::PgPool;
use std::collections::HashSet;

use crate::models::{Room, RoomId, RoomStatus, RoomWithCounts, Scene, SceneId, SceneLayout, UserId};
use crate::repository::{RoomRepository, SceneRepository};
use crate::{Error, Result};

/// How many suffixed slug candidates to try before giving up
const MAX_SLUG_ATTEMPTS: u32 = 50;

/// Room lifecycle: creation, dashboard listing, egress bookkeeping, scenes
#[derive(Clone)]
pub struct RoomService {
    pool: PgPool,
    rooms: RoomRepository,
    scenes: SceneRepository,
}

impl RoomService {
    pub fn new(pool: PgPool, rooms: RoomRepository, scenes: SceneRepository) -> Self {
        Self { pool, rooms, scenes }
    }

    /// Create a room with a unique slug and a default active solo scene.
    /// Both inserts share one transaction.
    pub async fn create_room(&self, owner_id: &UserId, name: &str) -> Result<Room> {
        let name = validate_room_name(name)?;
        let slug = self.unique_slug(name).await?;
        let room = Room::new(owner_id.clone(), name.to_string(), slug);

        let mut scene = Scene::new(room.id.clone(), SceneLayout::Solo, serde_json::json!([]));
        scene.is_active = true;

        let mut tx = self.pool.begin().await?;
        let created = self.rooms.create_with_executor(&room, &mut *tx).await?;
        self.scenes.create_with_executor(&scene, &mut *tx).await?;
        tx.commit().await?;

        tracing::info!(room_id = %created.id, slug = %created.slug, "Room created");
        Ok(created)
    }

    /// Get a room, erroring when absent
    pub async fn get_room(&self, room_id: &RoomId) -> Result<Room> {
        self.rooms
            .get_by_id(room_id)
            .await?
            .ok_or_else(|| Error::NotFound("Room not found".to_string()))
    }

    /// Get a room owned by the given user, erroring on missing or foreign rooms
    pub async fn get_owned_room(&self, room_id: &RoomId, owner_id: &UserId) -> Result<Room> {
        let room = self.get_room(room_id).await?;
        if &room.owner_id != owner_id {
            return Err(Error::Authorization(
                "You do not own this room".to_string(),
            ));
        }
        Ok(room)
    }

    /// Find a room by its public slug (guest join page)
    pub async fn get_room_by_slug(&self, slug: &str) -> Result<Room> {
        self.rooms
            .get_by_slug(slug)
            .await?
            .ok_or_else(|| Error::NotFound("Room not found".to_string()))
    }

    /// Dashboard listing with participant/destination counts
    pub async fn list_rooms(&self, owner_id: &UserId) -> Result<Vec<RoomWithCounts>> {
        self.rooms.list_by_owner_with_counts(owner_id).await
    }

    pub async fn rename_room(&self, room_id: &RoomId, name: &str) -> Result<Room> {
        let name = validate_room_name(name)?;
        self.rooms.update_name(room_id, name).await
    }

    pub async fn end_room(&self, room_id: &RoomId) -> Result<Room> {
        self.rooms.update_status(room_id, RoomStatus::Ended).await
    }

    pub async fn delete_room(&self, room_id: &RoomId) -> Result<()> {
        if !self.rooms.delete(room_id).await? {
            return Err(Error::NotFound("Room not found".to_string()));
        }
        Ok(())
    }

    // Egress bookkeeping. These flip local flags only; the remote job is
    // the caller's responsibility.

    pub async fn mark_streaming_started(&self, room_id: &RoomId, egress_id: &str) -> Result<Room> {
        self.rooms
            .set_streaming(room_id, egress_id, chrono::Utc::now())
            .await
    }

    pub async fn mark_streaming_stopped(&self, room_id: &RoomId) -> Result<Room> {
        self.rooms.clear_streaming(room_id).await
    }

    pub async fn mark_recording_started(&self, room_id: &RoomId, egress_id: &str) -> Result<Room> {
        self.rooms
            .set_recording(room_id, egress_id, chrono::Utc::now())
            .await
    }

    pub async fn mark_recording_stopped(&self, room_id: &RoomId) -> Result<Room> {
        self.rooms.clear_recording(room_id).await
    }

    // Scenes

    pub async fn create_scene(
        &self,
        room_id: &RoomId,
        layout: SceneLayout,
        overlays: serde_json::Value,
    ) -> Result<Scene> {
        if !overlays.is_array() {
            return Err(Error::InvalidInput("Overlays must be an array".to_string()));
        }
        let scene = Scene::new(room_id.clone(), layout, overlays);
        self.scenes.create_with_executor(&scene, &self.pool).await
    }

    pub async fn list_scenes(&self, room_id: &RoomId) -> Result<Vec<Scene>> {
        self.scenes.list_by_room(room_id).await
    }

    pub async fn active_scene(&self, room_id: &RoomId) -> Result<Option<Scene>> {
        self.scenes.get_active_by_room(room_id).await
    }

    pub async fn activate_scene(&self, room_id: &RoomId, scene_id: &SceneId) -> Result<Scene> {
        self.require_scene_in_room(room_id, scene_id).await?;
        self.scenes.activate(room_id, scene_id).await
    }

    /// Delete a scene. The active scene cannot be deleted.
    pub async fn delete_scene(&self, room_id: &RoomId, scene_id: &SceneId) -> Result<()> {
        let scene = self.require_scene_in_room(room_id, scene_id).await?;
        if scene.is_active {
            return Err(Error::InvalidInput(
                "Cannot delete the active scene".to_string(),
            ));
        }
        self.scenes.delete(scene_id).await?;
        Ok(())
    }

    async fn require_scene_in_room(&self, room_id: &RoomId, scene_id: &SceneId) -> Result<Scene> {
        let scene = self
            .scenes
            .get_by_id(scene_id)
            .await?
            .ok_or_else(|| Error::NotFound("Scene not found".to_string()))?;
        if &scene.room_id != room_id {
            return Err(Error::NotFound("Scene not found".to_string()));
        }
        Ok(scene)
    }

    /// Slugify the name, then append `-1`, `-2`, ... until the slug is free
    async fn unique_slug(&self, name: &str) -> Result<String> {
        let base = slugify(name);
        let base = if base.is_empty() { "room".to_string() } else { base };

        let taken: HashSet<String> = self
            .rooms
            .list_slugs_with_prefix(&base)
            .await?
            .into_iter()
            .collect();

        next_free_slug(&base, &taken).ok_or_else(|| {
            Error::AlreadyExists("Could not find a free slug for this room name".to_string())
        })
    }
}

/// Trimmed name, 1..=255 characters (not bytes)
fn validate_room_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 255 {
        return Err(Error::InvalidInput(
            "Room name must be between 1 and 255 characters".to_string(),
        ));
    }
    Ok(name)
}

/// The base slug when free, otherwise the first free `base-N` candidate
fn next_free_slug(base: &str, taken: &HashSet<String>) -> Option<String> {
    if !taken.contains(base) {
        return Some(base.to_string());
    }
    (1..=MAX_SLUG_ATTEMPTS)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
}

/// Lowercase, alphanumerics kept, everything else collapsed to single dashes
fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("My Cool Show"), "my-cool-show");
        assert_eq!(slugify("Friday Night Live!"), "friday-night-live");
    }

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("a  --  b"), "a-b");
        assert_eq!(slugify("  leading & trailing  "), "leading-trailing");
    }

    #[test]
    fn test_slugify_non_ascii() {
        assert_eq!(slugify("café #42"), "caf-42");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_room_name_length_counts_characters() {
        // 255 two-byte characters is 510 bytes but still a valid name
        let name = "ü".repeat(255);
        assert_eq!(validate_room_name(&name).unwrap(), name);

        assert!(validate_room_name(&"ü".repeat(256)).is_err());
        assert!(validate_room_name("   ").is_err());
        assert_eq!(validate_room_name("  My Show  ").unwrap(), "My Show");
    }

    #[test]
    fn test_next_free_slug_prefers_base() {
        let taken = HashSet::new();
        assert_eq!(next_free_slug("my-show", &taken).unwrap(), "my-show");
    }

    #[test]
    fn test_next_free_slug_suffixes_on_collision() {
        let taken: HashSet<String> = ["my-show".to_string()].into();
        assert_eq!(next_free_slug("my-show", &taken).unwrap(), "my-show-1");

        let taken: HashSet<String> =
            ["my-show".to_string(), "my-show-1".to_string(), "my-show-2".to_string()].into();
        assert_eq!(next_free_slug("my-show", &taken).unwrap(), "my-show-3");
    }

    #[test]
    fn test_next_free_slug_gives_up_when_exhausted() {
        let mut taken: HashSet<String> =
            (1..=MAX_SLUG_ATTEMPTS).map(|n| format!("my-show-{n}")).collect();
        taken.insert("my-show".to_string());
        assert!(next_free_slug("my-show", &taken).is_none());
    }
}
