//! Access token minting for the external video service.
//!
//! The video service accepts HS256 JWTs signed with the API secret. Tokens
//! are built by hand (HMAC over base64url JSON segments) rather than through
//! a JWT library so the claim layout matches the service's expectations
//! exactly, camelCase grant keys included.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::MediaConfig;
use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Participant token lifetime
const PARTICIPANT_TOKEN_TTL: i64 = 6 * 3600;
/// Server-to-server token lifetime
const API_TOKEN_TTL: i64 = 600;

/// Room permissions embedded in an access token
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoGrant {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(rename = "roomJoin", skip_serializing_if = "Option::is_none")]
    pub room_join: Option<bool>,
    #[serde(rename = "roomRecord", skip_serializing_if = "Option::is_none")]
    pub room_record: Option<bool>,
    #[serde(rename = "canPublish", skip_serializing_if = "Option::is_none")]
    pub can_publish: Option<bool>,
    #[serde(rename = "canSubscribe", skip_serializing_if = "Option::is_none")]
    pub can_subscribe: Option<bool>,
    #[serde(rename = "canPublishData", skip_serializing_if = "Option::is_none")]
    pub can_publish_data: Option<bool>,
    #[serde(rename = "canUpdateMetadata", skip_serializing_if = "Option::is_none")]
    pub can_update_metadata: Option<bool>,
}

impl VideoGrant {
    /// Grant for a room participant. Hosts may push data messages and
    /// update participant metadata; guests may not.
    #[must_use]
    pub fn participant(room: &str, is_host: bool) -> Self {
        Self {
            room: Some(room.to_string()),
            room_join: Some(true),
            can_publish: Some(true),
            can_subscribe: Some(true),
            can_publish_data: Some(is_host),
            can_update_metadata: Some(is_host),
            ..Self::default()
        }
    }

    /// Grant for server-to-server calls (egress control)
    #[must_use]
    pub fn recorder() -> Self {
        Self {
            room_record: Some(true),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    video: VideoGrant,
}

/// Mints access tokens for the external video service
#[derive(Clone)]
pub struct MediaTokenService {
    api_key: String,
    api_secret: String,
    ws_url: String,
}

impl std::fmt::Debug for MediaTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTokenService")
            .field("api_key", &self.api_key)
            .field("ws_url", &self.ws_url)
            .finish()
    }
}

impl MediaTokenService {
    pub fn new(media: &MediaConfig) -> Result<Self> {
        if media.api_key.is_empty() || media.api_secret.is_empty() || media.ws_url.is_empty() {
            return Err(Error::Config(
                "Media service api_key, api_secret and ws_url are required".to_string(),
            ));
        }

        Ok(Self {
            api_key: media.api_key.clone(),
            api_secret: media.api_secret.clone(),
            ws_url: media.ws_url.clone(),
        })
    }

    /// Client-facing websocket URL participants connect to
    #[must_use]
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Mint an access token for a participant joining a room (6h lifetime)
    pub fn participant_token(
        &self,
        identity: &str,
        display_name: &str,
        grant: VideoGrant,
    ) -> Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(PARTICIPANT_TOKEN_TTL)).timestamp(),
            name: Some(display_name.to_string()),
            video: grant,
        };

        self.encode(&claims)
    }

    /// Mint a short-lived server token for egress API calls (10min lifetime)
    pub fn api_token(&self) -> Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            iss: self.api_key.clone(),
            sub: self.api_key.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(API_TOKEN_TTL)).timestamp(),
            name: None,
            video: VideoGrant::recorder(),
        };

        self.encode(&claims)
    }

    fn encode(&self, claims: &TokenClaims) -> Result<String> {
        let header = serde_json::json!({"alg": "HS256", "typ": "JWT"});

        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| Error::Internal(format!("Invalid HMAC key: {e}")))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> MediaTokenService {
        MediaTokenService::new(&MediaConfig {
            api_key: "APIabc123".to_string(),
            api_secret: "supersecret".to_string(),
            ws_url: "wss://media.example.com".to_string(),
        })
        .unwrap()
    }

    fn decode_claims(token: &str) -> serde_json::Value {
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        let bytes = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let result = MediaTokenService::new(&MediaConfig::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_host_token_claims() {
        let svc = service();
        let grant = VideoGrant::participant("my-show", true);
        let token = svc.participant_token("tok123", "Alice", grant).unwrap();

        let claims = decode_claims(&token);
        assert_eq!(claims["iss"], "APIabc123");
        assert_eq!(claims["sub"], "tok123");
        assert_eq!(claims["name"], "Alice");
        assert_eq!(claims["video"]["room"], "my-show");
        assert_eq!(claims["video"]["roomJoin"], true);
        assert_eq!(claims["video"]["canPublish"], true);
        assert_eq!(claims["video"]["canSubscribe"], true);
        assert_eq!(claims["video"]["canPublishData"], true);
        assert_eq!(claims["video"]["canUpdateMetadata"], true);

        let lifetime = claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap();
        assert_eq!(lifetime, 6 * 3600);
    }

    #[test]
    fn test_guest_token_restricts_grant() {
        let svc = service();
        let grant = VideoGrant::participant("my-show", false);
        let token = svc.participant_token("tok456", "Bob", grant).unwrap();

        let claims = decode_claims(&token);
        assert_eq!(claims["video"]["canPublishData"], false);
        assert_eq!(claims["video"]["canUpdateMetadata"], false);
        // Guests can still publish their own media
        assert_eq!(claims["video"]["canPublish"], true);
    }

    #[test]
    fn test_api_token_claims() {
        let svc = service();
        let token = svc.api_token().unwrap();

        let claims = decode_claims(&token);
        assert_eq!(claims["iss"], "APIabc123");
        assert_eq!(claims["sub"], "APIabc123");
        assert_eq!(claims["video"]["roomRecord"], true);
        assert!(claims["video"].get("roomJoin").is_none());
        assert!(claims.get("name").is_none());

        let lifetime = claims["exp"].as_i64().unwrap() - claims["iat"].as_i64().unwrap();
        assert_eq!(lifetime, 600);
    }

    #[test]
    fn test_signature_verifies() {
        let svc = service();
        let token = svc
            .participant_token("id", "Name", VideoGrant::participant("room", false))
            .unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let mut mac = HmacSha256::new_from_slice(b"supersecret").unwrap();
        mac.update(format!("{}.{}", parts[0], parts[1]).as_bytes());
        let expected = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        assert_eq!(parts[2], expected);
    }

    #[test]
    fn test_header_segment() {
        let svc = service();
        let token = svc.api_token().unwrap();
        let header_b64 = token.split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64).unwrap()).unwrap();
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["typ"], "JWT");
    }
}
