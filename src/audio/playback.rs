use std::io::Cursor;
use std::sync::mpsc::RecvTimeoutError;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Decoded reply audio ready for playback.
///
/// Ownership moves into the sink on play; the playable handle is released
/// exactly once per play call, on every exit path.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Encoded container bytes as returned by the query service
    pub bytes: Vec<u8>,
    /// Container/codec tag (e.g. "wav", "mp3")
    pub format: String,
}

/// Why a play call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEnd {
    /// The clip played to its natural end
    Finished,
    /// A newer clip replaced this one
    Superseded,
    /// Playback was stopped explicitly
    Stopped,
}

/// Errors raised while opening the output or starting a clip.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to open audio output: {0}")]
    Output(String),

    #[error("unplayable audio clip: {0}")]
    UnplayableClip(String),

    #[error("playback worker is gone")]
    WorkerGone,
}

/// Playback seam over the platform audio output.
///
/// `play` starts the clip and returns immediately with a completion receiver
/// that fires exactly once; an already-playing clip is superseded first.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&mut self, clip: AudioClip)
        -> Result<oneshot::Receiver<PlaybackEnd>, PlaybackError>;

    async fn pause(&mut self) -> Result<(), PlaybackError>;

    async fn resume(&mut self) -> Result<(), PlaybackError>;

    async fn stop(&mut self) -> Result<(), PlaybackError>;

    /// Get sink name for logging
    fn name(&self) -> &str;
}

enum SinkCommand {
    Play {
        clip: AudioClip,
        done_tx: oneshot::Sender<PlaybackEnd>,
        result_tx: oneshot::Sender<Result<(), PlaybackError>>,
    },
    Pause,
    Resume,
    Stop,
}

/// rodio-backed [`AudioSink`].
///
/// `rodio::OutputStream` is not `Send`, so a dedicated worker thread owns the
/// output handle and the active `Sink`; commands cross over a channel. rodio
/// has no end-of-clip callback, so the worker polls sink emptiness between
/// commands.
pub struct RodioSink {
    cmd_tx: Option<std::sync::mpsc::Sender<SinkCommand>>,
}

impl RodioSink {
    pub fn new() -> Self {
        Self { cmd_tx: None }
    }

    /// Spawn the worker on first use so constructing the sink never touches
    /// the audio hardware.
    fn ensure_worker(&mut self) -> &std::sync::mpsc::Sender<SinkCommand> {
        self.cmd_tx.get_or_insert_with(|| {
            let (cmd_tx, cmd_rx) = std::sync::mpsc::channel();
            thread::spawn(move || run_playback_worker(cmd_rx));
            cmd_tx
        })
    }

    fn send(&mut self, cmd: SinkCommand) -> Result<(), PlaybackError> {
        self.ensure_worker()
            .send(cmd)
            .map_err(|_| PlaybackError::WorkerGone)
    }
}

impl Default for RodioSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioSink for RodioSink {
    async fn play(
        &mut self,
        clip: AudioClip,
    ) -> Result<oneshot::Receiver<PlaybackEnd>, PlaybackError> {
        let (done_tx, done_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();

        self.send(SinkCommand::Play {
            clip,
            done_tx,
            result_tx,
        })?;

        result_rx.await.map_err(|_| PlaybackError::WorkerGone)??;
        Ok(done_rx)
    }

    async fn pause(&mut self) -> Result<(), PlaybackError> {
        self.send(SinkCommand::Pause)
    }

    async fn resume(&mut self) -> Result<(), PlaybackError> {
        self.send(SinkCommand::Resume)
    }

    async fn stop(&mut self) -> Result<(), PlaybackError> {
        self.send(SinkCommand::Stop)
    }

    fn name(&self) -> &str {
        "rodio"
    }
}

/// The playable handle for one play call. Consuming it stops the sink and
/// fires the completion notification, so release happens exactly once.
struct ActiveClip {
    sink: rodio::Sink,
    done_tx: Option<oneshot::Sender<PlaybackEnd>>,
}

impl ActiveClip {
    fn release(mut self, end: PlaybackEnd) {
        self.sink.stop();
        if let Some(tx) = self.done_tx.take() {
            let _ = tx.send(end);
        }
        debug!(?end, "playback released");
    }
}

fn run_playback_worker(cmd_rx: std::sync::mpsc::Receiver<SinkCommand>) {
    let (_stream, handle) = match rodio::OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            warn!("no audio output available: {e}");
            // Keep answering so callers get an error instead of a hang.
            while let Ok(cmd) = cmd_rx.recv() {
                if let SinkCommand::Play { result_tx, .. } = cmd {
                    let _ = result_tx.send(Err(PlaybackError::Output(e.to_string())));
                }
            }
            return;
        }
    };

    let mut active: Option<ActiveClip> = None;

    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(SinkCommand::Play {
                clip,
                done_tx,
                result_tx,
            }) => {
                // No overlapping audio: the previous clip is stopped and
                // released before the new one starts.
                if let Some(previous) = active.take() {
                    previous.release(PlaybackEnd::Superseded);
                }

                match start_clip(&handle, clip) {
                    Ok(sink) => {
                        active = Some(ActiveClip {
                            sink,
                            done_tx: Some(done_tx),
                        });
                        let _ = result_tx.send(Ok(()));
                    }
                    Err(e) => {
                        let _ = result_tx.send(Err(e));
                    }
                }
            }
            Ok(SinkCommand::Pause) => {
                if let Some(clip) = &active {
                    clip.sink.pause();
                }
            }
            Ok(SinkCommand::Resume) => {
                if let Some(clip) = &active {
                    clip.sink.play();
                }
            }
            Ok(SinkCommand::Stop) => {
                if let Some(clip) = active.take() {
                    clip.release(PlaybackEnd::Stopped);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if let Some(clip) = active.take() {
                    clip.release(PlaybackEnd::Stopped);
                }
                return;
            }
        }

        // Natural end of the current clip.
        if active.as_ref().map(|c| c.sink.empty()).unwrap_or(false) {
            if let Some(clip) = active.take() {
                clip.release(PlaybackEnd::Finished);
            }
        }
    }
}

fn start_clip(
    handle: &rodio::OutputStreamHandle,
    clip: AudioClip,
) -> Result<rodio::Sink, PlaybackError> {
    let format = clip.format.clone();
    let source = rodio::Decoder::new(Cursor::new(clip.bytes))
        .map_err(|e| PlaybackError::UnplayableClip(format!("{format}: {e}")))?;

    let sink = rodio::Sink::try_new(handle).map_err(|e| PlaybackError::Output(e.to_string()))?;
    sink.append(source);

    info!(%format, "playback started");
    Ok(sink)
}

/// Plays one decoded clip at a time and drives the review player.
///
/// Chat-pipeline playback is fire-and-forget: `play` hands the clip to the
/// sink and returns its completion receiver without waiting. The
/// pause/resume pair serves the book-reader review player and tracks its own
/// paused flag, independent of the chat pipeline.
pub struct PlaybackCoordinator {
    sink: Box<dyn AudioSink>,
    paused: bool,
}

impl PlaybackCoordinator {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            paused: false,
        }
    }

    /// Start playing a clip, superseding any clip already playing.
    pub async fn play(
        &mut self,
        clip: AudioClip,
    ) -> Result<oneshot::Receiver<PlaybackEnd>, PlaybackError> {
        self.paused = false;
        self.sink.play(clip).await
    }

    pub async fn pause(&mut self) -> Result<(), PlaybackError> {
        if !self.paused {
            self.sink.pause().await?;
            self.paused = true;
        }
        Ok(())
    }

    pub async fn resume(&mut self) -> Result<(), PlaybackError> {
        if self.paused {
            self.sink.resume().await?;
            self.paused = false;
        }
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), PlaybackError> {
        self.paused = false;
        self.sink.stop().await
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
