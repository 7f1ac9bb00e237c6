use crate::models::{Destination, DestinationConfig, DestinationId, DestinationKind, RoomId};
use crate::repository::{DestinationRecord, DestinationRepository};
use crate::service::credential_encryption::CredentialEncryption;
use crate::{Error, Result};

/// RTMP destination management. Stream keys are encrypted before they
/// touch the database.
#[derive(Clone)]
pub struct DestinationService {
    destinations: DestinationRepository,
    encryption: CredentialEncryption,
}

impl DestinationService {
    pub fn new(destinations: DestinationRepository, encryption: CredentialEncryption) -> Self {
        Self {
            destinations,
            encryption,
        }
    }

    pub async fn create(
        &self,
        room_id: &RoomId,
        kind: DestinationKind,
        name: &str,
        config: DestinationConfig,
    ) -> Result<Destination> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Destination name is required".to_string()));
        }

        let destination = Destination::new(room_id.clone(), kind, name.to_string(), config);
        let record = self.to_record(&destination)?;
        let created = self.destinations.create(&record).await?;

        self.from_record(created)
    }

    pub async fn get(&self, room_id: &RoomId, destination_id: &DestinationId) -> Result<Destination> {
        let record = self
            .destinations
            .get_by_id(destination_id)
            .await?
            .ok_or_else(|| Error::NotFound("Destination not found".to_string()))?;
        if &record.room_id != room_id {
            return Err(Error::NotFound("Destination not found".to_string()));
        }

        self.from_record(record)
    }

    pub async fn list(&self, room_id: &RoomId) -> Result<Vec<Destination>> {
        let records = self.destinations.list_by_room(room_id).await?;
        records.into_iter().map(|r| self.from_record(r)).collect()
    }

    /// Enabled destinations with their decrypted configs (egress start path)
    pub async fn list_enabled(&self, room_id: &RoomId) -> Result<Vec<Destination>> {
        let records = self.destinations.list_enabled_by_room(room_id).await?;
        records.into_iter().map(|r| self.from_record(r)).collect()
    }

    /// Partial update. `url`/`key` merge into the stored config; a field
    /// left as `None` keeps its current value.
    pub async fn update(
        &self,
        room_id: &RoomId,
        destination_id: &DestinationId,
        name: Option<&str>,
        url: Option<String>,
        key: Option<String>,
    ) -> Result<Destination> {
        let current = self.get(room_id, destination_id).await?;

        let name = match name {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => current.name.clone(),
        };
        let config = DestinationConfig {
            url: url.or(current.config.url),
            key: key.or(current.config.key),
        };

        let ciphertext = self.encryption.encrypt_config(&config)?;
        let updated = self
            .destinations
            .update(destination_id, &name, &ciphertext)
            .await?;

        self.from_record(updated)
    }

    pub async fn toggle(&self, room_id: &RoomId, destination_id: &DestinationId) -> Result<Destination> {
        // Ownership check before the blind toggle
        self.get(room_id, destination_id).await?;
        let record = self.destinations.toggle_enabled(destination_id).await?;
        self.from_record(record)
    }

    pub async fn delete(&self, room_id: &RoomId, destination_id: &DestinationId) -> Result<()> {
        self.get(room_id, destination_id).await?;
        self.destinations.delete(destination_id).await?;
        Ok(())
    }

    fn to_record(&self, destination: &Destination) -> Result<DestinationRecord> {
        Ok(DestinationRecord {
            id: destination.id.clone(),
            room_id: destination.room_id.clone(),
            kind: destination.kind,
            name: destination.name.clone(),
            config_ciphertext: self.encryption.encrypt_config(&destination.config)?,
            is_enabled: destination.is_enabled,
            created_at: destination.created_at,
            updated_at: destination.updated_at,
        })
    }

    fn from_record(&self, record: DestinationRecord) -> Result<Destination> {
        Ok(Destination {
            id: record.id,
            room_id: record.room_id,
            kind: record.kind,
            name: record.name,
            config: self.encryption.decrypt_config(&record.config_ciphertext)?,
            is_enabled: record.is_enabled,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}
