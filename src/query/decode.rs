use base64::Engine;
use tracing::{debug, warn};

use super::messages::QueryReply;
use crate::audio::AudioClip;

/// Container tags the playback decoder can handle. Anything else means "no
/// audio available", never a failed turn.
const SUPPORTED_FORMATS: &[&str] = &["wav", "mp3", "mpeg", "ogg", "flac"];

/// Decoded reply: text fields plus playable audio, if any survived decoding.
#[derive(Debug, Default)]
pub struct QueryResult {
    /// Transcription of the spoken query (audio queries only)
    pub request_text: Option<String>,
    /// The assistant's textual answer
    pub response_text: Option<String>,
    /// Synthesized speech, decoded and ready for playback
    pub response_audio: Option<AudioClip>,
    /// Human-readable service error
    pub error_message: Option<String>,
}

/// Turn a wire reply into a [`QueryResult`].
///
/// Never fails: malformed base64 or an unusable format tag drop the audio and
/// deliver a text-only result.
pub fn decode_reply(reply: QueryReply) -> QueryResult {
    let response_audio = decode_audio(reply.response_audio.as_deref(), reply.audio_format.as_deref());

    QueryResult {
        request_text: reply.request_text,
        response_text: reply.response_text,
        response_audio,
        error_message: reply.error,
    }
}

fn decode_audio(encoded: Option<&str>, format: Option<&str>) -> Option<AudioClip> {
    let encoded = encoded?;

    let Some(format) = format else {
        debug!("reply carries audio without a format tag; delivering text only");
        return None;
    };

    let format = format.trim().to_ascii_lowercase();
    if !SUPPORTED_FORMATS.contains(&format.as_str()) {
        warn!(%format, "unrecognized reply audio format; delivering text only");
        return None;
    }

    match base64::engine::general_purpose::STANDARD.decode(encoded) {
        Ok(bytes) if !bytes.is_empty() => Some(AudioClip { bytes, format }),
        Ok(_) => {
            debug!("reply audio payload is empty");
            None
        }
        Err(e) => {
            warn!("malformed base64 in reply audio: {e}; delivering text only");
            None
        }
    }
}
