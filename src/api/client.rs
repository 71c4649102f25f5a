use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{StatusCode, Url};

use super::types::TranscriptResponse;
use super::{FetchError, TranscriptSource};
use crate::core::types::Transcript;

/// Fetches transcripts from the platform's REST API.
///
/// `GET {base_url}/chats/{conversation_id}/messages`, authenticated with a bearer
/// token when one is configured.
///
/// # Example
/// ```no_run
/// use wellchat::api::{HttpTranscriptClient, TranscriptSource};
/// # async fn demo() -> Result<(), wellchat::api::FetchError> {
/// let client = HttpTranscriptClient::new("http://localhost:3000/api", None);
/// let transcript = client.fetch_transcript("c1").await?;
/// println!("{} messages", transcript.messages.len());
/// # Ok(())
/// # }
/// ```
pub struct HttpTranscriptClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTranscriptClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    fn transcript_url(&self, conversation_id: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FetchError::Config(format!("invalid API URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| FetchError::Config(format!("API URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["chats", conversation_id, "messages"]);
        Ok(url)
    }
}

#[async_trait]
impl TranscriptSource for HttpTranscriptClient {
    async fn fetch_transcript(&self, conversation_id: &str) -> Result<Transcript, FetchError> {
        let url = self.transcript_url(conversation_id)?;
        info!("Fetching transcript from {}", url);

        let mut request = self.client.get(url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("Transcript fetch for {} rejected: {}", conversation_id, status);
                return Err(FetchError::Unauthorized);
            }
            StatusCode::NOT_FOUND => {
                warn!("Conversation {} not found", conversation_id);
                return Err(FetchError::NotFound);
            }
            s if !s.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(FetchError::Api {
                    status: s.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        let parsed: TranscriptResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Parse(e.to_string()))?;
        debug!(
            "Transcript for {}: {} messages, {} participants",
            conversation_id,
            parsed.messages.len(),
            parsed.chat.participants.len()
        );
        Ok(parsed.into())
    }
}
