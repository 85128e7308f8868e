use std::io::Cursor;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::device::{AudioFragment, CaptureDevice, CaptureProfile, DeviceError};

/// A finished recording, finalized into one container blob.
#[derive(Debug, Clone)]
pub struct AudioBlob {
    /// Encoded container bytes (WAV)
    pub bytes: Vec<u8>,
    /// Container/codec tag sent alongside the bytes
    pub format: String,
    /// Sample rate of the encoded audio in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Total interleaved samples across all fragments
    pub sample_count: usize,
}

impl AudioBlob {
    /// Approximate duration of the recording in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Errors raised while starting, running, or finalizing a recording.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("a recording session is already active")]
    AlreadyRecording,

    #[error("failed to finalize recording: {0}")]
    Finalize(#[from] hound::Error),

    #[error("fragment collector failed: {0}")]
    Collector(String),
}

/// Transient state of an in-progress recording.
///
/// Owned exclusively by the manager while active; the collector task drains
/// fragments continuously so nothing is lost between flushes.
struct RecordingSession {
    collector: JoinHandle<Vec<AudioFragment>>,
    started_at: Instant,
}

/// Owns the microphone stream and produces a finished audio blob on demand.
pub struct AudioCaptureManager {
    device: Box<dyn CaptureDevice>,
    profile: CaptureProfile,
    session: Option<RecordingSession>,
}

impl AudioCaptureManager {
    pub fn new(device: Box<dyn CaptureDevice>, profile: CaptureProfile) -> Self {
        Self {
            device,
            profile,
            session: None,
        }
    }

    /// Whether a recording session is currently active.
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Request exclusive device access and begin accumulating fragments.
    ///
    /// On failure no session is created; the caller surfaces a user-facing
    /// message instead of retrying.
    pub async fn start_capture(&mut self) -> Result<(), CaptureError> {
        if self.session.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let fragment_rx = self.device.open(&self.profile).await?;
        let collector = tokio::spawn(collect_fragments(fragment_rx));

        self.session = Some(RecordingSession {
            collector,
            started_at: Instant::now(),
        });

        info!(device = self.device.name(), "capture started");
        Ok(())
    }

    /// Finalize the active recording into a single WAV blob.
    ///
    /// With no active session this is a no-op returning `None` and the device
    /// is not touched. Otherwise the device stream is released first,
    /// unconditionally, and only then are the accumulated fragments joined
    /// and encoded.
    pub async fn stop_capture(&mut self) -> Result<Option<AudioBlob>, CaptureError> {
        let Some(session) = self.session.take() else {
            debug!("stop_capture with no active session");
            return Ok(None);
        };

        // Release the stream before anything that can fail; closing drops
        // the sender side, so the collector drains to completion below.
        let close_result = self.device.close().await;

        let fragments = match session.collector.await {
            Ok(fragments) => fragments,
            Err(e) => {
                close_result?;
                return Err(CaptureError::Collector(e.to_string()));
            }
        };
        close_result?;

        let blob = encode_wav_blob(&fragments, &self.profile)?;

        info!(
            fragments = fragments.len(),
            elapsed_secs = session.started_at.elapsed().as_secs_f64(),
            bytes = blob.bytes.len(),
            "capture finalized"
        );

        Ok(Some(blob))
    }
}

/// Drain fragments into memory in arrival order until the device closes.
async fn collect_fragments(mut rx: mpsc::Receiver<AudioFragment>) -> Vec<AudioFragment> {
    let mut fragments = Vec::new();
    while let Some(fragment) = rx.recv().await {
        fragments.push(fragment);
    }
    fragments
}

/// Concatenate fragments in arrival order and encode them as an in-memory
/// WAV file.
fn encode_wav_blob(
    fragments: &[AudioFragment],
    profile: &CaptureProfile,
) -> Result<AudioBlob, CaptureError> {
    let (sample_rate, channels) = fragments
        .first()
        .map(|f| (f.sample_rate, f.channels))
        .unwrap_or((profile.sample_rate, profile.channels));

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    let mut sample_count = 0usize;

    for fragment in fragments {
        for &sample in &fragment.samples {
            writer.write_sample(sample)?;
        }
        sample_count += fragment.samples.len();
    }

    writer.finalize()?;

    Ok(AudioBlob {
        bytes: cursor.into_inner(),
        format: "wav".to_string(),
        sample_rate,
        channels,
        sample_count,
    })
}
