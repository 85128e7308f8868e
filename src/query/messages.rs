use serde::{Deserialize, Serialize};

/// Body of a text query POSTed to `/api/query`
#[derive(Debug, Serialize)]
pub struct TextQueryRequest {
    pub query: String,
    pub voice_effect: f32,
}

/// Reply payload from the query service.
///
/// `/api/query` and `/api/listen` use different field names for the same
/// things (`response`/`response_text`, `audio`/`response_audio`); the aliases
/// let one type cover both endpoints. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryReply {
    /// Transcription of what was said; only present for audio queries
    #[serde(default)]
    pub request_text: Option<String>,

    /// The assistant's textual answer
    #[serde(default, alias = "response")]
    pub response_text: Option<String>,

    /// Base64-encoded synthesized speech
    #[serde(default, alias = "audio")]
    pub response_audio: Option<String>,

    /// Container/codec tag for `response_audio` (e.g. "wav", "mp3")
    #[serde(default)]
    pub audio_format: Option<String>,

    /// Service-side error message, already human readable
    #[serde(default)]
    pub error: Option<String>,
}
