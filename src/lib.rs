pub mod audio;
pub mod config;
pub mod query;
pub mod session;

pub use audio::{
    AudioBlob, AudioCaptureManager, AudioClip, AudioFragment, AudioSink, CaptureDevice,
    CaptureError, CaptureProfile, DeviceError, MicrophoneDevice, PlaybackCoordinator, PlaybackEnd,
    PlaybackError, RodioSink,
};
pub use config::Config;
pub use query::{
    decode_reply, HttpQueryService, QueryReply, QueryResult, QueryService, TransportError,
};
pub use session::{
    user_facing_message, ConversationHistory, SessionController, SessionError, SessionState,
    Speaker, Turn,
};
