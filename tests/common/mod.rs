// Scripted collaborators for integration tests: a capture device that
// replays canned fragments, a query service with queued outcomes, and an
// audio sink that records what it was asked to play.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use robook_voice::audio::{
    AudioBlob, AudioCaptureManager, AudioClip, AudioFragment, AudioSink, CaptureDevice,
    CaptureProfile, DeviceError, PlaybackCoordinator, PlaybackEnd, PlaybackError,
};
use robook_voice::query::{QueryReply, QueryService, TransportError};
use robook_voice::SessionController;
use tokio::sync::{mpsc, oneshot};

/// A capture device that emits a fixed fragment sequence on open and counts
/// open/close calls so tests can assert on stream release behavior.
pub struct ScriptedCaptureDevice {
    fragments: Vec<AudioFragment>,
    fail_open: bool,
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    open: bool,
}

impl ScriptedCaptureDevice {
    pub fn new(fragments: Vec<AudioFragment>) -> Self {
        Self {
            fragments,
            fail_open: false,
            opens: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            open: false,
        }
    }

    /// A device whose open always fails, as if permission were denied.
    pub fn failing() -> Self {
        let mut device = Self::new(Vec::new());
        device.fail_open = true;
        device
    }

    /// Clone the call counters before the device moves into the manager.
    pub fn counters(&self) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (Arc::clone(&self.opens), Arc::clone(&self.closes))
    }
}

#[async_trait]
impl CaptureDevice for ScriptedCaptureDevice {
    async fn open(
        &mut self,
        _profile: &CaptureProfile,
    ) -> Result<mpsc::Receiver<AudioFragment>, DeviceError> {
        if self.fail_open {
            return Err(DeviceError::Unavailable("scripted failure".to_string()));
        }

        self.opens.fetch_add(1, Ordering::SeqCst);
        self.open = true;

        let (tx, rx) = mpsc::channel(self.fragments.len().max(1));
        for fragment in self.fragments.clone() {
            tx.try_send(fragment).expect("fragment channel capacity");
        }
        // Dropping the sender closes the channel, like a released stream.
        Ok(rx)
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// One scripted response from the mock query service.
pub enum ScriptedOutcome {
    Reply(QueryReply),
    TransportFailure,
}

/// Query service that pops scripted outcomes and records every call.
pub struct MockQueryService {
    outcomes: Mutex<VecDeque<ScriptedOutcome>>,
    pub text_calls: Mutex<Vec<(String, f32)>>,
    pub audio_calls: Mutex<Vec<(AudioBlob, f32)>>,
}

impl MockQueryService {
    pub fn with_outcomes(outcomes: Vec<ScriptedOutcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            text_calls: Mutex::new(Vec::new()),
            audio_calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(reply: QueryReply) -> Arc<Self> {
        Self::with_outcomes(vec![ScriptedOutcome::Reply(reply)])
    }

    pub fn failing() -> Arc<Self> {
        Self::with_outcomes(vec![ScriptedOutcome::TransportFailure])
    }

    fn next(&self) -> ScriptedOutcome {
        self.outcomes
            .lock()
            .expect("outcomes lock")
            .pop_front()
            .unwrap_or(ScriptedOutcome::Reply(QueryReply::default()))
    }

    fn resolve(&self, outcome: ScriptedOutcome) -> Result<QueryReply, TransportError> {
        match outcome {
            ScriptedOutcome::Reply(reply) => Ok(reply),
            ScriptedOutcome::TransportFailure => Err(TransportError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            )),
        }
    }
}

#[async_trait]
impl QueryService for MockQueryService {
    async fn submit_text(
        &self,
        query: &str,
        voice_effect: f32,
    ) -> Result<QueryReply, TransportError> {
        self.text_calls
            .lock()
            .expect("text_calls lock")
            .push((query.to_string(), voice_effect));
        let outcome = self.next();
        self.resolve(outcome)
    }

    async fn submit_audio(
        &self,
        blob: AudioBlob,
        voice_effect: f32,
    ) -> Result<QueryReply, TransportError> {
        self.audio_calls
            .lock()
            .expect("audio_calls lock")
            .push((blob, voice_effect));
        let outcome = self.next();
        self.resolve(outcome)
    }
}

/// Sink that records played clips and resolves completion immediately.
#[derive(Default)]
pub struct RecordingSink {
    pub played: Arc<Mutex<Vec<AudioClip>>>,
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(
        &mut self,
        clip: AudioClip,
    ) -> Result<oneshot::Receiver<PlaybackEnd>, PlaybackError> {
        self.played.lock().expect("played lock").push(clip);
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(PlaybackEnd::Finished);
        Ok(rx)
    }

    async fn pause(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Mono 44.1 kHz fragment with the given samples.
pub fn fragment(samples: Vec<i16>) -> AudioFragment {
    AudioFragment {
        samples,
        sample_rate: 44_100,
        channels: 1,
    }
}

/// Controller wired to scripted collaborators and a throwaway sink.
pub fn controller_with(
    device: ScriptedCaptureDevice,
    service: Arc<MockQueryService>,
) -> SessionController {
    let capture = AudioCaptureManager::new(Box::new(device), CaptureProfile::default());
    let playback = PlaybackCoordinator::new(Box::new(RecordingSink::default()));
    SessionController::new(capture, service, playback)
}
