pub mod capture;
pub mod device;
pub mod playback;

pub use capture::{AudioBlob, AudioCaptureManager, CaptureError};
pub use device::{AudioFragment, CaptureDevice, CaptureProfile, DeviceError, MicrophoneDevice};
pub use playback::{
    AudioClip, AudioSink, PlaybackCoordinator, PlaybackEnd, PlaybackError, RodioSink,
};
