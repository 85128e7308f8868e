pub mod controller;
pub mod history;

pub use controller::{
    user_facing_message, SessionController, SessionError, SessionState, AUDIO_INPUT_SENTINEL,
    DEFAULT_VOICE_EFFECT, GENERIC_FAILURE_MESSAGE, MICROPHONE_ERROR_MESSAGE, NO_RESPONSE_MESSAGE,
    SERVER_FALLBACK_MESSAGE, UNRECOGNIZED_AUDIO_MESSAGE,
};
pub use history::{normalize_transcript, ConversationHistory, Speaker, Turn};
