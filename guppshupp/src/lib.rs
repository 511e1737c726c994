//! Minimal client for the GUPPSHUPP memory API.
//!
//! This crate provides a focused client for the two endpoints the
//! persona pipeline relies on:
//! - Memory extraction from a chat transcript
//! - Personality-conditioned response generation
//!
//! Every call is a single request with no retry. Failures are reported as
//! either a transport problem or a non-success status from the service.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Environment variable holding the service base URL.
pub const BASE_URL_ENV: &str = "GUPPSHUPP_API_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when talking to the service.
#[derive(Debug, Error)]
pub enum Error {
    /// The call could not be completed, or its response could not be decoded.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error(
        "Request failed (status {status}){}",
        detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
    )]
    Request { status: u16, detail: Option<String> },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the service explicitly rejected the call for exceeding its rate limit.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::Request { status: 429, .. })
    }

    /// HTTP status, when the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// GUPPSHUPP API client.
#[derive(Clone)]
pub struct Guppshupp {
    client: reqwest::Client,
    base_url: String,
}

impl Guppshupp {
    /// Create a client for the service at `base_url` with default timeouts.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, Error> {
        Self::with_timeouts(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a client with explicit request and connect timeouts.
    pub fn with_timeouts(
        base_url: impl AsRef<str>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, Error> {
        let base_url = base_url.as_ref().trim().trim_end_matches('/');
        let parsed = reqwest::Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{base_url}': {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .default_headers(default_headers())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    /// The base URL every endpoint is resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Extract durable memories from a conversation.
    pub async fn extract_memory(&self, messages: &[Message]) -> Result<ExtractedMemories, Error> {
        self.post("extract_memory", &ExtractRequest { messages }).await
    }

    /// Generate a response to `user_message` in the voice of `kind`.
    pub async fn transform_personality(
        &self,
        user_message: &str,
        kind: PersonalityKind,
        memories: &ExtractedMemories,
    ) -> Result<String, Error> {
        let request = TransformRequest {
            user_message,
            personality_type: kind,
            memories,
        };
        let response: TransformResponse = self.post("transform_personality", &request).await?;
        Ok(response.response)
    }

    /// Check that the service is up.
    pub async fn health(&self) -> Result<Health, Error> {
        let url = self.endpoint("health");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        decode(&url, response).await
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, Error>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        decode(&url, response).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

impl fmt::Debug for Guppshupp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guppshupp")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

async fn decode<R: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<R, Error> {
    let status = response.status();
    debug!(%url, status = status.as_u16(), "service responded");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Request {
            status: status.as_u16(),
            detail: parse_detail(&body),
        });
    }

    response
        .json()
        .await
        .map_err(|e| Error::Transport(format!("Failed to decode response: {e}")))
}

/// Pull the human-readable `detail` out of an error body, if there is one.
///
/// FastAPI-style validation errors carry a list instead of a string; those
/// are kept as compact JSON rather than dropped.
fn parse_detail(body: &str) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

// ============================================================================
// Public types
// ============================================================================

/// One line of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Memories extracted from a conversation, produced by a single call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMemories {
    pub preferences: Vec<String>,
    pub facts: Vec<String>,
    pub emotional_patterns: Vec<String>,
}

impl ExtractedMemories {
    /// Total number of items across all three categories.
    pub fn total(&self) -> usize {
        self.preferences.len() + self.facts.len() + self.emotional_patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// The response styles the service can write in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalityKind {
    CalmMentor,
    WittyFriend,
    Therapist,
}

impl PersonalityKind {
    /// Every kind, in the order they are requested.
    pub const ALL: [PersonalityKind; 3] = [
        PersonalityKind::CalmMentor,
        PersonalityKind::WittyFriend,
        PersonalityKind::Therapist,
    ];

    /// Wire name, as sent in `personality_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            PersonalityKind::CalmMentor => "calm_mentor",
            PersonalityKind::WittyFriend => "witty_friend",
            PersonalityKind::Therapist => "therapist",
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            PersonalityKind::CalmMentor => "Calm Mentor",
            PersonalityKind::WittyFriend => "Witty Friend",
            PersonalityKind::Therapist => "Therapist",
        }
    }
}

impl fmt::Display for PersonalityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string that does not name a personality kind.
#[derive(Debug, Error)]
#[error("Unknown personality kind '{0}' (expected calm_mentor, witty_friend or therapist)")]
pub struct ParsePersonalityError(String);

impl FromStr for PersonalityKind {
    type Err = ParsePersonalityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PersonalityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| ParsePersonalityError(s.to_string()))
    }
}

/// Service health report.
#[derive(Debug, Clone, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub service: String,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    messages: &'a [Message],
}

#[derive(Debug, Serialize)]
struct TransformRequest<'a> {
    user_message: &'a str,
    personality_type: PersonalityKind,
    memories: &'a ExtractedMemories,
}

#[derive(Debug, Deserialize)]
struct TransformResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}
