//! Client for the video service's egress API (Twirp over HTTP).
//!
//! Egress jobs composite a room into a single video and fan it out to RTMP
//! destinations and/or an MP4 file in S3. This client only starts, stops,
//! and lists jobs; it never reconciles local state with the remote side.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::config::{MediaConfig, StorageConfig};
use crate::models::Destination;
use crate::service::media_token::MediaTokenService;
use crate::{Error, Result};

/// RTMP protocol discriminant in stream outputs
const STREAM_PROTOCOL_RTMP: i32 = 0;
/// MP4 file type discriminant in file outputs
const FILE_TYPE_MP4: i32 = 0;

#[derive(Debug, Clone, Serialize)]
struct StreamOutput {
    protocol: i32,
    urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct S3Upload {
    access_key: String,
    secret: String,
    bucket: String,
    region: String,
    endpoint: String,
    force_path_style: bool,
}

impl From<&StorageConfig> for S3Upload {
    fn from(storage: &StorageConfig) -> Self {
        Self {
            access_key: storage.access_key.clone(),
            secret: storage.secret.clone(),
            bucket: storage.bucket.clone(),
            region: storage.region.clone(),
            endpoint: storage.endpoint.clone(),
            force_path_style: storage.force_path_style,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct FileOutput {
    file_type: i32,
    filepath: String,
    s3: S3Upload,
}

#[derive(Debug, Serialize)]
struct StartRoomCompositeRequest {
    room_name: String,
    layout: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_outputs: Option<Vec<StreamOutput>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_outputs: Option<Vec<FileOutput>>,
}

/// Result of starting an egress job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgressStarted {
    pub egress_id: String,
    pub status: String,
}

/// A single uploaded file reported by a stopped egress
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EgressFileResult {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "de_size")]
    pub size: Option<i64>,
}

// The service reports sizes as either a JSON number or a decimal string
fn de_size<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::Number(n)) => n.as_i64(),
        Some(JsonValue::String(s)) => s.parse().ok(),
        _ => None,
    })
}

impl EgressFileResult {
    /// Preferred URL for the stored file
    #[must_use]
    pub fn file_url(&self) -> Option<String> {
        self.location.clone().or_else(|| self.filename.clone())
    }
}

/// Result of stopping an egress job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EgressStopped {
    pub egress_id: String,
    pub status: String,
    pub file_results: Vec<EgressFileResult>,
    pub stream_results: Vec<JsonValue>,
}

/// Result of updating the stream outputs of a running egress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamUpdated {
    pub egress_id: String,
    pub status: String,
}

/// Twirp client for the egress API
#[derive(Clone)]
pub struct EgressClient {
    http: reqwest::Client,
    api_url: String,
    tokens: MediaTokenService,
    storage: StorageConfig,
}

impl std::fmt::Debug for EgressClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EgressClient")
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl EgressClient {
    pub fn new(media: &MediaConfig, storage: StorageConfig) -> Result<Self> {
        let tokens = MediaTokenService::new(media)?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_url: media.api_url(),
            tokens,
            storage,
        })
    }

    /// Start streaming a composited room to its enabled RTMP destinations.
    ///
    /// Destinations that are disabled or have no usable URL are skipped;
    /// erroring only when nothing remains to stream to.
    pub async fn start_streaming(
        &self,
        room_name: &str,
        destinations: &[Destination],
        layout: &str,
    ) -> Result<EgressStarted> {
        let urls = rtmp_urls(destinations);
        if urls.is_empty() {
            return Err(Error::InvalidInput(
                "No enabled destinations with valid RTMP configuration".to_string(),
            ));
        }

        let request = StartRoomCompositeRequest {
            room_name: room_name.to_string(),
            layout: layout.to_string(),
            stream_outputs: Some(vec![StreamOutput {
                protocol: STREAM_PROTOCOL_RTMP,
                urls,
            }]),
            file_outputs: None,
        };

        let response = self.twirp("StartRoomCompositeEgress", &request).await?;
        Ok(started_from(&response))
    }

    /// Start recording a composited room to an MP4 in S3
    pub async fn start_recording(
        &self,
        room_name: &str,
        slug: &str,
        layout: &str,
    ) -> Result<EgressStarted> {
        let request = StartRoomCompositeRequest {
            room_name: room_name.to_string(),
            layout: layout.to_string(),
            stream_outputs: None,
            file_outputs: Some(vec![self.file_output(slug)]),
        };

        let response = self.twirp("StartRoomCompositeEgress", &request).await?;
        Ok(started_from(&response))
    }

    /// Start streaming and recording in a single egress job. With no usable
    /// destination URLs the job still records (empty stream outputs).
    pub async fn start_streaming_and_recording(
        &self,
        room_name: &str,
        slug: &str,
        destinations: &[Destination],
        layout: &str,
    ) -> Result<EgressStarted> {
        let urls = rtmp_urls(destinations);
        let stream_outputs = if urls.is_empty() {
            Some(vec![])
        } else {
            Some(vec![StreamOutput {
                protocol: STREAM_PROTOCOL_RTMP,
                urls,
            }])
        };

        let request = StartRoomCompositeRequest {
            room_name: room_name.to_string(),
            layout: layout.to_string(),
            stream_outputs,
            file_outputs: Some(vec![self.file_output(slug)]),
        };

        let response = self.twirp("StartRoomCompositeEgress", &request).await?;
        Ok(started_from(&response))
    }

    /// Stop a running egress job
    pub async fn stop_egress(&self, egress_id: &str) -> Result<EgressStopped> {
        let request = serde_json::json!({ "egress_id": egress_id });
        let response = self.twirp("StopEgress", &request).await?;

        let file_results = response
            .get("file_results")
            .cloned()
            .map(|v| serde_json::from_value(v).unwrap_or_default())
            .unwrap_or_default();
        let stream_results = response
            .get("stream_results")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(EgressStopped {
            egress_id: str_field(&response, "egress_id").unwrap_or_else(|| egress_id.to_string()),
            status: str_field(&response, "status").unwrap_or_else(|| "EGRESS_ENDING".to_string()),
            file_results,
            stream_results,
        })
    }

    /// List egress jobs, optionally filtered to a room and to active jobs
    pub async fn list_egress(
        &self,
        room_name: Option<&str>,
        active_only: bool,
    ) -> Result<Vec<JsonValue>> {
        let mut request = serde_json::Map::new();
        if let Some(room_name) = room_name {
            request.insert("room_name".to_string(), JsonValue::String(room_name.to_string()));
        }
        if active_only {
            request.insert("active".to_string(), JsonValue::Bool(true));
        }

        let response = self.twirp("ListEgress", &JsonValue::Object(request)).await?;
        Ok(response
            .get("items")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Add or remove RTMP URLs on a running stream egress
    pub async fn update_stream(
        &self,
        egress_id: &str,
        add_urls: &[String],
        remove_urls: &[String],
    ) -> Result<StreamUpdated> {
        let mut request = serde_json::Map::new();
        request.insert("egress_id".to_string(), JsonValue::String(egress_id.to_string()));
        if !add_urls.is_empty() {
            request.insert("add_output_urls".to_string(), serde_json::json!(add_urls));
        }
        if !remove_urls.is_empty() {
            request.insert("remove_output_urls".to_string(), serde_json::json!(remove_urls));
        }

        let response = self.twirp("UpdateStream", &JsonValue::Object(request)).await?;
        Ok(StreamUpdated {
            egress_id: str_field(&response, "egress_id").unwrap_or_else(|| egress_id.to_string()),
            status: str_field(&response, "status").unwrap_or_else(|| "EGRESS_ACTIVE".to_string()),
        })
    }

    fn file_output(&self, slug: &str) -> FileOutput {
        let ts = chrono::Utc::now().timestamp();
        FileOutput {
            file_type: FILE_TYPE_MP4,
            filepath: format!("recordings/{slug}/{slug}-{ts}.mp4"),
            s3: S3Upload::from(&self.storage),
        }
    }

    async fn twirp<T: Serialize>(&self, method: &str, payload: &T) -> Result<JsonValue> {
        let token = self.tokens.api_token()?;
        let url = format!("{}/twirp/livekit.Egress/{method}", self.api_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<JsonValue>(&body)
                .ok()
                .and_then(|v| v.get("msg").and_then(JsonValue::as_str).map(String::from))
                .unwrap_or(body);
            tracing::error!(%method, %status, error = %message, "Egress API error");
            return Err(Error::Upstream(format!("Egress API error: {message}")));
        }

        Ok(response.json().await.unwrap_or(JsonValue::Null))
    }
}

fn started_from(response: &JsonValue) -> EgressStarted {
    EgressStarted {
        egress_id: str_field(response, "egress_id").unwrap_or_default(),
        status: str_field(response, "status").unwrap_or_else(|| "EGRESS_STARTING".to_string()),
    }
}

fn str_field(value: &JsonValue, key: &str) -> Option<String> {
    value.get(key).and_then(JsonValue::as_str).map(String::from)
}

fn rtmp_urls(destinations: &[Destination]) -> Vec<String> {
    destinations
        .iter()
        .filter(|d| d.is_enabled)
        .filter_map(|d| d.config.rtmp_url())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DestinationConfig, DestinationKind, RoomId};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> EgressClient {
        let media = MediaConfig {
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
            ws_url: server.uri().replace("http://", "ws://"),
        };
        EgressClient::new(&media, StorageConfig::default()).unwrap()
    }

    fn destination(url: &str, key: Option<&str>, enabled: bool) -> Destination {
        let mut d = Destination::new(
            RoomId::new(),
            DestinationKind::Rtmp,
            "dest".to_string(),
            DestinationConfig {
                url: Some(url.to_string()),
                key: key.map(String::from),
            },
        );
        d.is_enabled = enabled;
        d
    }

    #[tokio::test]
    async fn test_start_streaming_builds_rtmp_urls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.Egress/StartRoomCompositeEgress"))
            .and(body_partial_json(serde_json::json!({
                "room_name": "my-show",
                "layout": "grid",
                "stream_outputs": [{
                    "protocol": 0,
                    "urls": ["rtmp://ingest.example.com/live/sk-1"]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "egress_id": "EG_abc", "status": "EGRESS_STARTING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let destinations = vec![
            destination("rtmp://ingest.example.com/live/", Some("sk-1"), true),
            destination("rtmp://other.example.com/live/", Some("sk-2"), false),
        ];

        let result = client
            .start_streaming("my-show", &destinations, "grid")
            .await
            .unwrap();
        assert_eq!(result.egress_id, "EG_abc");
        assert_eq!(result.status, "EGRESS_STARTING");
    }

    #[tokio::test]
    async fn test_start_streaming_no_usable_destinations() {
        let server = MockServer::start().await;
        let client = client_for(&server);

        let destinations = vec![destination("rtmp://x.example.com/", Some("k"), false)];
        let result = client.start_streaming("room", &destinations, "grid").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_start_recording_includes_file_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.Egress/StartRoomCompositeEgress"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "egress_id": "EG_rec"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.start_recording("room", "my-show", "solo").await.unwrap();
        assert_eq!(result.egress_id, "EG_rec");
        // Missing status falls back to the starting state
        assert_eq!(result.status, "EGRESS_STARTING");

        let requests = server.received_requests().await.unwrap();
        let body: JsonValue = serde_json::from_slice(&requests[0].body).unwrap();
        let filepath = body["file_outputs"][0]["filepath"].as_str().unwrap();
        assert!(filepath.starts_with("recordings/my-show/my-show-"));
        assert!(filepath.ends_with(".mp4"));
        assert_eq!(body["file_outputs"][0]["file_type"], 0);
        assert!(body.get("stream_outputs").is_none());
    }

    #[tokio::test]
    async fn test_go_live_without_destinations_still_records() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.Egress/StartRoomCompositeEgress"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "egress_id": "EG_both", "status": "EGRESS_STARTING"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .start_streaming_and_recording("room", "slug", &[], "grid")
            .await
            .unwrap();
        assert_eq!(result.egress_id, "EG_both");

        let requests = server.received_requests().await.unwrap();
        let body: JsonValue = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["stream_outputs"], serde_json::json!([]));
        assert!(body["file_outputs"].is_array());
    }

    #[tokio::test]
    async fn test_stop_egress_parses_file_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.Egress/StopEgress"))
            .and(body_partial_json(serde_json::json!({"egress_id": "EG_1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "egress_id": "EG_1",
                "status": "EGRESS_COMPLETE",
                "file_results": [
                    {"filename": "recordings/a/a-1.mp4", "location": "https://s3/a-1.mp4", "size": "1048576"}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.stop_egress("EG_1").await.unwrap();
        assert_eq!(result.status, "EGRESS_COMPLETE");
        let file = &result.file_results[0];
        assert_eq!(file.file_url().unwrap(), "https://s3/a-1.mp4");
        assert_eq!(file.size, Some(1_048_576));
    }

    #[tokio::test]
    async fn test_stop_egress_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.Egress/StopEgress"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.stop_egress("EG_2").await.unwrap();
        assert_eq!(result.egress_id, "EG_2");
        assert_eq!(result.status, "EGRESS_ENDING");
        assert!(result.file_results.is_empty());
    }

    #[tokio::test]
    async fn test_list_egress_filters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.Egress/ListEgress"))
            .and(body_partial_json(serde_json::json!({
                "room_name": "my-show", "active": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"egress_id": "EG_1", "status": "EGRESS_ACTIVE"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let items = client.list_egress(Some("my-show"), true).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["egress_id"], "EG_1");
    }

    #[tokio::test]
    async fn test_update_stream_omits_empty_url_lists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.Egress/UpdateStream"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "egress_id": "EG_1", "status": "EGRESS_ACTIVE"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .update_stream("EG_1", &["rtmp://new.example.com/live/key".to_string()], &[])
            .await
            .unwrap();
        assert_eq!(result.status, "EGRESS_ACTIVE");

        let requests = server.received_requests().await.unwrap();
        let body: JsonValue = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("add_output_urls").is_some());
        assert!(body.get("remove_output_urls").is_none());
    }

    #[tokio::test]
    async fn test_api_error_surfaces_msg() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/twirp/livekit.Egress/StopEgress"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "code": "not_found", "msg": "egress does not exist"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.stop_egress("EG_missing").await.unwrap_err();
        match err {
            Error::Upstream(message) => assert!(message.contains("egress does not exist")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
