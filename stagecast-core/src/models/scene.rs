use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

use super::id::{RoomId, SceneId};

/// Composition layout passed to the egress composite renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SceneLayout {
    Grid,
    #[default]
    Solo,
    Speaker,
    PictureInPicture,
}

impl SceneLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Solo => "solo",
            Self::Speaker => "speaker",
            Self::PictureInPicture => "picture_in_picture",
        }
    }
}

impl FromStr for SceneLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grid" => Ok(Self::Grid),
            "solo" => Ok(Self::Solo),
            "speaker" => Ok(Self::Speaker),
            "picture_in_picture" | "pip" => Ok(Self::PictureInPicture),
            _ => Err(format!("Unknown scene layout: {s}")),
        }
    }
}

impl std::fmt::Display for SceneLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    pub room_id: RoomId,
    pub layout: SceneLayout,
    pub overlays: JsonValue,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Scene {
    pub fn new(room_id: RoomId, layout: SceneLayout, overlays: JsonValue) -> Self {
        let now = Utc::now();
        Self {
            id: SceneId::new(),
            room_id,
            layout,
            overlays,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_parsing() {
        assert_eq!(SceneLayout::from_str("grid").unwrap(), SceneLayout::Grid);
        assert_eq!(SceneLayout::from_str("pip").unwrap(), SceneLayout::PictureInPicture);
        assert!(SceneLayout::from_str("mosaic").is_err());
    }

    #[test]
    fn test_new_scene_is_inactive() {
        let scene = Scene::new(RoomId::new(), SceneLayout::Solo, serde_json::json!([]));
        assert!(!scene.is_active);
    }
}
