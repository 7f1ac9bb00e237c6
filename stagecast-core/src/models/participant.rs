use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::{ParticipantId, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Host,
    #[default]
    Guest,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Guest => "guest",
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host)
    }
}

impl FromStr for ParticipantRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "host" => Ok(Self::Host),
            "guest" => Ok(Self::Guest),
            _ => Err(format!("Unknown participant role: {s}")),
        }
    }
}

impl std::fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub room_id: RoomId,
    pub name: String,
    pub role: ParticipantRole,
    /// Application-issued random bearer string; distinct from the
    /// video-service access token (a JWT)
    pub token: String,
    pub media_identity: Option<String>,
    pub is_connected: bool,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(room_id: RoomId, name: String, role: ParticipantRole, token: String) -> Self {
        let now = Utc::now();
        let id = ParticipantId::new();
        // The media identity is visible to other room participants, so it
        // must be the opaque row id, never the bearer token
        let media_identity = Some(id.to_string());
        Self {
            id,
            room_id,
            name,
            role,
            token,
            media_identity,
            is_connected: false,
            joined_at: None,
            left_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(ParticipantRole::from_str("host").unwrap(), ParticipantRole::Host);
        assert_eq!(ParticipantRole::from_str("GUEST").unwrap(), ParticipantRole::Guest);
        assert!(ParticipantRole::from_str("producer").is_err());
    }

    #[test]
    fn test_new_participant_identity_is_the_row_id() {
        let p = Participant::new(
            RoomId::new(),
            "Alice".to_string(),
            ParticipantRole::Guest,
            "tok".to_string(),
        );
        assert_eq!(p.media_identity.as_deref(), Some(p.id.as_str()));
        // The bearer token never doubles as the identity
        assert_ne!(p.media_identity.as_deref(), Some(p.token.as_str()));
        assert!(!p.is_connected);
    }
}
