use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::history::{normalize_transcript, ConversationHistory, Turn};
use crate::audio::{AudioCaptureManager, AudioClip, CaptureError, PlaybackCoordinator};
use crate::query::{decode_reply, QueryResult, QueryService};

/// Shown when an audio query came back without a transcription.
pub const UNRECOGNIZED_AUDIO_MESSAGE: &str =
    "متأسفانه نتوانستم صدای شما را تشخیص دهم. لطفاً دوباره تلاش کنید.";

/// Shown when a transcribed audio query got neither an answer nor an error.
pub const NO_RESPONSE_MESSAGE: &str =
    "متأسفانه نتوانستم پاسخ مناسب را دریافت کنم. لطفاً دوباره تلاش کنید.";

/// Shown when a submission failed outright (transport or capture).
pub const GENERIC_FAILURE_MESSAGE: &str = "متأسفانه خطایی رخ داد. لطفاً دوباره تلاش کنید.";

/// Fallback answer for a text query whose reply carried no usable field.
pub const SERVER_FALLBACK_MESSAGE: &str = "خطا در ارتباط با سرور. لطفاً دوباره تلاش کنید.";

/// Surfaced (outside the conversation) when the microphone cannot be opened.
pub const MICROPHONE_ERROR_MESSAGE: &str =
    "خطا در دسترسی به میکروفون. لطفاً مجوز دسترسی را بررسی کنید.";

/// Stands in for the user's words when an audio-only submission failed
/// before a transcription existed.
pub const AUDIO_INPUT_SENTINEL: &str = "🎤";

pub const DEFAULT_VOICE_EFFECT: f32 = 0.5;

/// Where the controller is in its capture/submit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Submitting,
}

/// Errors the controller reports to its caller instead of the conversation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("empty query text")]
    EmptyInput,

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Localized message to show the user for a controller error, if the error
/// warrants one. Empty input is silently ignored, like the original UI.
pub fn user_facing_message(err: &SessionError) -> Option<&'static str> {
    match err {
        SessionError::EmptyInput => None,
        SessionError::Capture(_) => Some(MICROPHONE_ERROR_MESSAGE),
    }
}

/// Orchestrates capture → submit → decode → append → play for one
/// conversation.
///
/// A single enumerated [`SessionState`] replaces scattered recording/
/// processing booleans; every transition is checked here. The controller is
/// driven through `&mut self`, so at most one capture/submit cycle can be in
/// flight per instance, and a submission always runs to completion before
/// the state resets; there is no cancellation of in-flight requests.
pub struct SessionController {
    capture: AudioCaptureManager,
    service: Arc<dyn QueryService>,
    playback: PlaybackCoordinator,
    history: ConversationHistory,
    state: SessionState,
    voice_effect: f32,
}

impl SessionController {
    pub fn new(
        capture: AudioCaptureManager,
        service: Arc<dyn QueryService>,
        playback: PlaybackCoordinator,
    ) -> Self {
        Self {
            capture,
            service,
            playback,
            history: ConversationHistory::new(),
            state: SessionState::Idle,
            voice_effect: DEFAULT_VOICE_EFFECT,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &[Turn] {
        self.history.turns()
    }

    pub fn voice_effect(&self) -> f32 {
        self.voice_effect
    }

    /// Set the server-side voice styling intensity, clamped to `[0.0, 1.0]`.
    pub fn set_voice_effect(&mut self, value: f32) {
        self.voice_effect = value.clamp(0.0, 1.0);
    }

    /// Review-player controls (pause/resume), separate from the chat
    /// pipeline's fire-and-forget playback.
    pub fn playback(&mut self) -> &mut PlaybackCoordinator {
        &mut self.playback
    }

    /// Begin a voice turn.
    ///
    /// Dropped with a warning while recording or while a submission is in
    /// flight. A device failure leaves the session idle and is returned to
    /// the caller to surface; it is never retried and never becomes a
    /// conversation turn.
    pub async fn start_recording(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Recording => {
                warn!("start_recording while already recording; dropped");
                return Ok(());
            }
            SessionState::Submitting => {
                warn!("start_recording while a submission is in flight; dropped");
                return Ok(());
            }
            SessionState::Idle => {}
        }

        self.capture.start_capture().await?;
        self.state = SessionState::Recording;
        info!("recording started");
        Ok(())
    }

    /// Finish the voice turn: finalize the recording and submit it.
    ///
    /// A no-op when nothing is recording. Whatever the outcome of the
    /// submission, the session ends back in `Idle`.
    pub async fn stop_recording(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Recording {
            warn!("stop_recording with no active recording; dropped");
            return Ok(());
        }

        self.state = SessionState::Submitting;
        let cycle = Uuid::new_v4();

        let blob = match self.capture.stop_capture().await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                warn!(%cycle, "recording stopped without a finalized blob");
                self.append_failure_turns(None);
                self.state = SessionState::Idle;
                return Ok(());
            }
            Err(e) => {
                error!(%cycle, "failed to finalize recording: {e}");
                self.append_failure_turns(None);
                self.state = SessionState::Idle;
                return Ok(());
            }
        };

        info!(%cycle, duration_secs = blob.duration_secs(), "submitting audio query");

        match self.service.submit_audio(blob, self.voice_effect).await {
            Ok(reply) => {
                let result = decode_reply(reply);
                self.append_audio_turns(&result);
                self.hand_off_playback(result.response_audio).await;
            }
            Err(e) => {
                error!(%cycle, "audio submission failed: {e}");
                self.append_failure_turns(None);
            }
        }

        self.state = SessionState::Idle;
        Ok(())
    }

    /// Submit a typed query.
    ///
    /// Blank input is rejected before any request is issued, with no side
    /// effects. Every outcome ends back in `Idle`.
    pub async fn submit_text(&mut self, text: &str) -> Result<(), SessionError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(SessionError::EmptyInput);
        }

        match self.state {
            SessionState::Idle => {}
            _ => {
                warn!("submit_text while busy; dropped");
                return Ok(());
            }
        }

        self.state = SessionState::Submitting;
        let cycle = Uuid::new_v4();
        info!(%cycle, "submitting text query");

        match self.service.submit_text(query, self.voice_effect).await {
            Ok(reply) => {
                let result = decode_reply(reply);
                self.append_text_turns(query, &result);
                self.hand_off_playback(result.response_audio).await;
            }
            Err(e) => {
                error!(%cycle, "text submission failed: {e}");
                self.append_failure_turns(Some(query));
            }
        }

        self.state = SessionState::Idle;
        Ok(())
    }

    /// Turn-append policy for audio queries.
    ///
    /// Without a transcription there is nothing to attribute to the user, so
    /// the cycle contributes exactly one assistant turn. With one, the
    /// normalized transcription is appended first, then the best available
    /// reply text.
    fn append_audio_turns(&mut self, result: &QueryResult) {
        let transcription = result
            .request_text
            .as_deref()
            .map(normalize_transcript)
            .filter(|t| !t.is_empty());

        let Some(transcription) = transcription else {
            self.history.append(Turn::assistant(UNRECOGNIZED_AUDIO_MESSAGE));
            return;
        };

        self.history.append(Turn::user(transcription));

        if let Some(text) = &result.response_text {
            self.history.append(Turn::assistant(text.clone()));
        } else if let Some(err) = &result.error_message {
            self.history.append(Turn::assistant(err.clone()));
        } else {
            self.history.append(Turn::assistant(NO_RESPONSE_MESSAGE));
        }
    }

    /// Turn-append policy for text queries: the typed text, then the reply
    /// (answer, service error, or the fixed fallback).
    fn append_text_turns(&mut self, query: &str, result: &QueryResult) {
        self.history.append(Turn::user(query));

        let reply = result
            .response_text
            .as_deref()
            .or(result.error_message.as_deref())
            .unwrap_or(SERVER_FALLBACK_MESSAGE);

        self.history.append(Turn::assistant(reply));
    }

    /// Failure path: the original input (or the audio sentinel) followed by
    /// the fixed failure message.
    fn append_failure_turns(&mut self, input: Option<&str>) {
        self.history
            .append(Turn::user(input.unwrap_or(AUDIO_INPUT_SENTINEL)));
        self.history.append(Turn::assistant(GENERIC_FAILURE_MESSAGE));
    }

    /// Hand reply audio to the coordinator without waiting on it; playback
    /// never blocks the submit cycle, and a playback failure only degrades
    /// to a silent turn.
    async fn hand_off_playback(&mut self, clip: Option<AudioClip>) {
        let Some(clip) = clip else {
            return;
        };

        match self.playback.play(clip).await {
            Ok(_completion) => {}
            Err(e) => warn!("reply playback unavailable: {e}"),
        }
    }
}
