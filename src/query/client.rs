use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use super::messages::{QueryReply, TextQueryRequest};
use crate::audio::AudioBlob;

/// Errors raised while talking to the query service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("query service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("query service returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// The query-service collaborator: accepts text or audio, returns text plus
/// optional synthesized speech.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn submit_text(&self, query: &str, voice_effect: f32)
        -> Result<QueryReply, TransportError>;

    async fn submit_audio(
        &self,
        blob: AudioBlob,
        voice_effect: f32,
    ) -> Result<QueryReply, TransportError>;
}

/// HTTP client for the library-assistant backend.
pub struct HttpQueryService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQueryService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl QueryService for HttpQueryService {
    async fn submit_text(
        &self,
        query: &str,
        voice_effect: f32,
    ) -> Result<QueryReply, TransportError> {
        debug!(%query, voice_effect, "posting text query");

        let response = self
            .client
            .post(self.endpoint("/api/query"))
            .json(&TextQueryRequest {
                query: query.to_string(),
                voice_effect,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }

        Ok(response.json().await?)
    }

    async fn submit_audio(
        &self,
        blob: AudioBlob,
        voice_effect: f32,
    ) -> Result<QueryReply, TransportError> {
        debug!(
            bytes = blob.bytes.len(),
            format = %blob.format,
            voice_effect,
            "posting audio query"
        );

        let file_name = format!("recording.{}", blob.format);
        let mime = format!("audio/{}", blob.format);

        let part = reqwest::multipart::Part::bytes(blob.bytes)
            .file_name(file_name)
            .mime_str(&mime)?;

        let form = reqwest::multipart::Form::new()
            .part("audio", part)
            .text("voice_effect", voice_effect.to_string());

        let response = self
            .client
            .post(self.endpoint("/api/listen"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}
