use rand::distr::Alphanumeric;
use rand::RngExt;

use crate::models::{Participant, ParticipantId, ParticipantRole, Room};
use crate::repository::ParticipantRepository;
use crate::service::media_token::{MediaTokenService, VideoGrant};
use crate::{Error, Result};

/// Invite token length (random alphanumeric)
const TOKEN_LENGTH: usize = 32;
/// Collision retries before giving up on token generation
const MAX_TOKEN_ATTEMPTS: u32 = 10;

/// The payload a participant needs to join the media room
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConnectedParticipant {
    pub access_token: String,
    pub ws_url: String,
    pub participant: Participant,
}

/// Participant invites and media-room connections
#[derive(Clone)]
pub struct ParticipantService {
    participants: ParticipantRepository,
    media_tokens: MediaTokenService,
}

impl ParticipantService {
    pub fn new(participants: ParticipantRepository, media_tokens: MediaTokenService) -> Self {
        Self {
            participants,
            media_tokens,
        }
    }

    /// Invite a participant to a room: generate a unique invite token and
    /// create the row with the row id as its media identity.
    pub async fn invite(&self, room: &Room, name: &str, role: ParticipantRole) -> Result<Participant> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Participant name is required".to_string()));
        }

        let token = self.unique_token().await?;
        let participant = Participant::new(room.id.clone(), name.to_string(), role, token);
        let created = self.participants.create(&participant).await?;

        tracing::info!(room_id = %room.id, participant_id = %created.id, role = %created.role, "Participant invited");
        Ok(created)
    }

    /// Find a participant by invite token within a room
    pub async fn get_by_token(&self, room: &Room, token: &str) -> Result<Participant> {
        self.participants
            .get_by_room_and_token(&room.id, token)
            .await?
            .ok_or_else(|| Error::NotFound("Participant not found".to_string()))
    }

    /// Exchange an invite token for a media access token without touching
    /// connection state (host-side studio flow).
    pub async fn mint_media_token(&self, room: &Room, token: &str) -> Result<ConnectedParticipant> {
        let participant = self.get_by_token(room, token).await?;
        self.build_connection(room, participant)
    }

    /// Exchange an invite token for a media access token. Marks the
    /// participant connected with `joined_at = now` (guest join flow).
    pub async fn connect(&self, room: &Room, token: &str) -> Result<ConnectedParticipant> {
        let participant = self.get_by_token(room, token).await?;
        let participant = self.participants.mark_connected(&participant.id).await?;
        self.build_connection(room, participant)
    }

    fn build_connection(&self, room: &Room, participant: Participant) -> Result<ConnectedParticipant> {
        let identity = participant
            .media_identity
            .clone()
            .unwrap_or_else(|| participant.id.to_string());
        let grant = VideoGrant::participant(&room.media_room_name, participant.role.is_host());
        let access_token = self
            .media_tokens
            .participant_token(&identity, &participant.name, grant)?;

        Ok(ConnectedParticipant {
            access_token,
            ws_url: self.media_tokens.ws_url().to_string(),
            participant,
        })
    }

    /// Mark a participant as having left the media room (guest leave flow)
    pub async fn disconnect(&self, room: &Room, token: &str) -> Result<Participant> {
        let participant = self.get_by_token(room, token).await?;
        self.participants.mark_disconnected(&participant.id).await
    }

    /// Find or create the room owner's host participant (studio page)
    pub async fn ensure_host(&self, room: &Room, owner_name: &str) -> Result<Participant> {
        let existing = self
            .participants
            .list_by_room(&room.id)
            .await?
            .into_iter()
            .find(|p| p.role.is_host() && p.name == owner_name);

        match existing {
            Some(host) => Ok(host),
            None => self.invite(room, owner_name, ParticipantRole::Host).await,
        }
    }

    pub async fn list(&self, room: &Room) -> Result<Vec<Participant>> {
        self.participants.list_by_room(&room.id).await
    }

    /// Remove a participant, verifying room ownership of the row
    pub async fn remove(&self, room: &Room, participant_id: &ParticipantId) -> Result<()> {
        let participant = self
            .participants
            .get_by_id(participant_id)
            .await?
            .ok_or_else(|| Error::NotFound("Participant not found".to_string()))?;
        if participant.room_id != room.id {
            return Err(Error::NotFound("Participant not found".to_string()));
        }

        self.participants.delete(participant_id).await?;
        Ok(())
    }

    async fn unique_token(&self) -> Result<String> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let token = generate_token();
            if !self.participants.token_exists(&token).await? {
                return Ok(token);
            }
        }

        Err(Error::Internal(
            "Could not generate a unique participant token".to_string(),
        ))
    }
}

fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_alphanumeric() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_tokens_differ() {
        assert_ne!(generate_token(), generate_token());
    }
}
