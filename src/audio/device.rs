use std::sync::{Arc, Mutex};
use std::thread;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info};

/// Fixed audio-acquisition parameters used for every recording.
///
/// Echo cancellation and noise suppression are requested from the host where
/// it supports them; they are carried here so every capture path asks for the
/// same treatment.
#[derive(Debug, Clone)]
pub struct CaptureProfile {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels (1 = mono)
    pub channels: u16,
    /// Ask the host to cancel acoustic echo
    pub echo_cancellation: bool,
    /// Ask the host to suppress background noise
    pub noise_suppression: bool,
    /// How much audio accumulates before a fragment is flushed downstream
    pub fragment_flush_ms: u64,
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
            fragment_flush_ms: 1_000,
        }
    }
}

impl CaptureProfile {
    /// Number of interleaved samples that make up one flushed fragment.
    pub fn samples_per_flush(&self) -> usize {
        let samples =
            self.sample_rate as u64 * self.channels as u64 * self.fragment_flush_ms / 1_000;
        samples.max(1) as usize
    }
}

/// One flushed buffer of captured audio (16-bit PCM, interleaved).
#[derive(Debug, Clone)]
pub struct AudioFragment {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

/// Errors raised while acquiring or running the capture stream.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("audio input device unavailable: {0}")]
    Unavailable(String),

    #[error("capture device is already open")]
    Busy,

    #[error("capture stream failed: {0}")]
    Stream(String),
}

/// Media-device seam for microphone capture.
///
/// Opening the device yields a channel receiver that delivers
/// [`AudioFragment`]s in arrival order until the device is closed. Closing
/// drops the sender side, so a consumer draining the receiver sees the
/// channel end exactly when the stream is released.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Acquire exclusive access to the input stream with the given profile.
    async fn open(
        &mut self,
        profile: &CaptureProfile,
    ) -> Result<mpsc::Receiver<AudioFragment>, DeviceError>;

    /// Release the input stream. Must be safe to call at most once per open.
    async fn close(&mut self) -> Result<(), DeviceError>;

    /// Check if the device currently holds an open stream
    fn is_open(&self) -> bool;

    /// Get device name for logging
    fn name(&self) -> &str;
}

/// Default-host microphone backed by cpal.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated OS thread
/// for its whole lifetime; the thread parks on a stop channel and dropping
/// the stream there releases the hardware on every exit path (explicit close,
/// manager drop, or thread teardown).
pub struct MicrophoneDevice {
    worker: Option<CaptureWorker>,
}

struct CaptureWorker {
    stop_tx: std::sync::mpsc::Sender<()>,
    thread: thread::JoinHandle<()>,
}

impl MicrophoneDevice {
    pub fn new() -> Self {
        Self { worker: None }
    }
}

impl Default for MicrophoneDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureDevice for MicrophoneDevice {
    async fn open(
        &mut self,
        profile: &CaptureProfile,
    ) -> Result<mpsc::Receiver<AudioFragment>, DeviceError> {
        if self.worker.is_some() {
            return Err(DeviceError::Busy);
        }

        let (fragment_tx, fragment_rx) = mpsc::channel(64);
        let (stop_tx, stop_rx) = std::sync::mpsc::channel();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let profile = profile.clone();
        let thread = thread::spawn(move || {
            run_capture_stream(profile, fragment_tx, stop_rx, ready_tx);
        });

        // The stream is built on the capture thread; wait for it to report
        // readiness without blocking the async runtime.
        let ready = tokio::task::spawn_blocking(move || ready_rx.recv())
            .await
            .map_err(|e| DeviceError::Stream(format!("capture setup task failed: {e}")))?;

        match ready {
            Ok(Ok(())) => {
                info!("microphone stream opened");
                self.worker = Some(CaptureWorker { stop_tx, thread });
                Ok(fragment_rx)
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(DeviceError::Stream(
                    "capture thread exited before reporting readiness".to_string(),
                ))
            }
        }
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        let _ = worker.stop_tx.send(());

        tokio::task::spawn_blocking(move || worker.thread.join())
            .await
            .map_err(|e| DeviceError::Stream(format!("capture teardown task failed: {e}")))?
            .map_err(|_| DeviceError::Stream("capture thread panicked".to_string()))?;

        info!("microphone stream released");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Body of the capture thread: owns the cpal stream from build to drop.
fn run_capture_stream(
    profile: CaptureProfile,
    fragment_tx: mpsc::Sender<AudioFragment>,
    stop_rx: std::sync::mpsc::Receiver<()>,
    ready_tx: std::sync::mpsc::Sender<Result<(), DeviceError>>,
) {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        let _ = ready_tx.send(Err(DeviceError::Unavailable(
            "no input device on the default audio host".to_string(),
        )));
        return;
    };

    let config = cpal::StreamConfig {
        channels: profile.channels,
        sample_rate: cpal::SampleRate(profile.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let sample_rate = profile.sample_rate;
    let channels = profile.channels;
    let flush_len = profile.samples_per_flush();

    // Samples accumulate here until a flush-sized fragment is ready; the
    // teardown path drains whatever is left so a stopped recording keeps
    // its tail.
    let pending = Arc::new(Mutex::new(Vec::<i16>::new()));

    let callback_pending = Arc::clone(&pending);
    let callback_tx = fragment_tx.clone();

    let stream = match device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let Ok(mut buf) = callback_pending.lock() else {
                return;
            };
            buf.extend(
                data.iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
            );
            while buf.len() >= flush_len {
                let samples: Vec<i16> = buf.drain(..flush_len).collect();
                // Drop the fragment if the channel is full; the receiver may
                // lag or already be gone.
                let _ = callback_tx.try_send(AudioFragment {
                    samples,
                    sample_rate,
                    channels,
                });
            }
        },
        move |err: cpal::StreamError| {
            error!("capture stream error: {err}");
        },
        None,
    ) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(DeviceError::Unavailable(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(DeviceError::Stream(e.to_string())));
        return;
    }

    if profile.echo_cancellation || profile.noise_suppression {
        info!(
            echo_cancellation = profile.echo_cancellation,
            noise_suppression = profile.noise_suppression,
            "capture profile hints requested from host"
        );
    }

    let _ = ready_tx.send(Ok(()));

    // Parked until close() sends a stop or the device is dropped.
    let _ = stop_rx.recv();

    // Stops the hardware stream and the data callback.
    drop(stream);

    // Flush the partial tail accumulated since the last full fragment.
    if let Ok(mut buf) = pending.lock() {
        if !buf.is_empty() {
            let samples = std::mem::take(&mut *buf);
            let _ = fragment_tx.try_send(AudioFragment {
                samples,
                sample_rate,
                channels,
            });
        }
    }

    // Dropping the last sender closes the fragment channel.
    drop(fragment_tx);
}
