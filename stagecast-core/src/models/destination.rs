use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::{DestinationId, RoomId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Youtube,
    Twitch,
    Facebook,
    Rtmp,
}

impl DestinationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Twitch => "twitch",
            Self::Facebook => "facebook",
            Self::Rtmp => "rtmp",
        }
    }
}

impl FromStr for DestinationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "youtube" => Ok(Self::Youtube),
            "twitch" => Ok(Self::Twitch),
            "facebook" => Ok(Self::Facebook),
            "rtmp" => Ok(Self::Rtmp),
            _ => Err(format!("Unknown destination kind: {s}")),
        }
    }
}

impl std::fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// RTMP endpoint secrets, stored encrypted at rest
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DestinationConfig {
    pub url: Option<String>,
    pub key: Option<String>,
}

impl DestinationConfig {
    /// Full RTMP ingest URL with the stream key appended.
    ///
    /// Returns None when no URL is configured. A URL without a key is
    /// returned as-is (the key may already be embedded).
    pub fn rtmp_url(&self) -> Option<String> {
        let url = self.url.as_deref()?;
        if url.is_empty() {
            return None;
        }
        match self.key.as_deref() {
            None | Some("") => Some(url.to_string()),
            Some(key) => Some(format!("{}/{key}", url.trim_end_matches('/'))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub room_id: RoomId,
    pub kind: DestinationKind,
    pub name: String,
    /// Decrypted endpoint config; never serialized into API responses
    #[serde(skip_serializing, default)]
    pub config: DestinationConfig,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Destination {
    pub fn new(
        room_id: RoomId,
        kind: DestinationKind,
        name: String,
        config: DestinationConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: DestinationId::new(),
            room_id,
            kind,
            name,
            config,
            is_enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rtmp_url_appends_key() {
        let config = DestinationConfig {
            url: Some("rtmp://a.rtmp.youtube.com/live2/".to_string()),
            key: Some("abcd-1234".to_string()),
        };
        assert_eq!(
            config.rtmp_url().unwrap(),
            "rtmp://a.rtmp.youtube.com/live2/abcd-1234"
        );
    }

    #[test]
    fn test_rtmp_url_without_key_passes_through() {
        let config = DestinationConfig {
            url: Some("rtmp://live.twitch.tv/app/sk_embedded".to_string()),
            key: None,
        };
        assert_eq!(
            config.rtmp_url().unwrap(),
            "rtmp://live.twitch.tv/app/sk_embedded"
        );
    }

    #[test]
    fn test_rtmp_url_without_url_is_none() {
        assert!(DestinationConfig::default().rtmp_url().is_none());
        let config = DestinationConfig {
            url: Some(String::new()),
            key: Some("key".to_string()),
        };
        assert!(config.rtmp_url().is_none());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(DestinationKind::from_str("youtube").unwrap(), DestinationKind::Youtube);
        assert!(DestinationKind::from_str("vimeo").is_err());
    }
}
