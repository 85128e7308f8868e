// Integration tests for recording capture and finalization.
//
// These verify that fragments concatenate in arrival order into one WAV
// blob, that the device stream is released on every exit path, and that
// stopping with no active session is a side-effect-free no-op.

mod common;

use std::fs;
use std::io::Cursor;
use std::sync::atomic::Ordering;

use anyhow::Result;
use common::{fragment, ScriptedCaptureDevice};
use robook_voice::audio::{AudioCaptureManager, CaptureError, CaptureProfile};
use tempfile::TempDir;

#[tokio::test]
async fn fragments_concatenate_in_arrival_order() -> Result<()> {
    let device = ScriptedCaptureDevice::new(vec![
        fragment(vec![1, 2, 3]),
        fragment(vec![4, 5]),
        fragment(vec![6]),
    ]);
    let (_opens, closes) = device.counters();
    let mut manager = AudioCaptureManager::new(Box::new(device), CaptureProfile::default());

    manager.start_capture().await?;
    assert!(manager.is_recording());

    let blob = manager
        .stop_capture()
        .await?
        .expect("active session should finalize into a blob");

    assert_eq!(blob.format, "wav");
    assert_eq!(blob.sample_rate, 44_100);
    assert_eq!(blob.channels, 1);
    assert_eq!(blob.sample_count, 6);
    assert_eq!(closes.load(Ordering::SeqCst), 1, "device released once");
    assert!(!manager.is_recording());

    // Decode the container and check sample order survived.
    let mut reader = hound::WavReader::new(Cursor::new(blob.bytes))?;
    let samples: Vec<i16> = reader.samples::<i16>().collect::<Result<_, _>>()?;
    assert_eq!(samples, vec![1, 2, 3, 4, 5, 6]);

    Ok(())
}

#[tokio::test]
async fn stop_without_start_is_a_noop() -> Result<()> {
    let device = ScriptedCaptureDevice::new(Vec::new());
    let (_opens, closes) = device.counters();
    let mut manager = AudioCaptureManager::new(Box::new(device), CaptureProfile::default());

    let blob = manager.stop_capture().await?;

    assert!(blob.is_none(), "no session should yield no blob");
    assert_eq!(closes.load(Ordering::SeqCst), 0, "no device release");

    Ok(())
}

#[tokio::test]
async fn open_failure_creates_no_session() -> Result<()> {
    let device = ScriptedCaptureDevice::failing();
    let (opens, closes) = device.counters();
    let mut manager = AudioCaptureManager::new(Box::new(device), CaptureProfile::default());

    let err = manager.start_capture().await;
    assert!(matches!(err, Err(CaptureError::Device(_))));
    assert!(!manager.is_recording());

    // The failed start must leave nothing behind to stop.
    assert!(manager.stop_capture().await?.is_none());
    assert_eq!(opens.load(Ordering::SeqCst), 0);
    assert_eq!(closes.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn second_start_is_rejected_while_recording() -> Result<()> {
    let device = ScriptedCaptureDevice::new(vec![fragment(vec![0; 4])]);
    let (opens, _closes) = device.counters();
    let mut manager = AudioCaptureManager::new(Box::new(device), CaptureProfile::default());

    manager.start_capture().await?;
    let second = manager.start_capture().await;

    assert!(matches!(second, Err(CaptureError::AlreadyRecording)));
    assert_eq!(opens.load(Ordering::SeqCst), 1, "device opened only once");

    manager.stop_capture().await?;
    Ok(())
}

#[tokio::test]
async fn empty_recording_still_releases_and_finalizes() -> Result<()> {
    let device = ScriptedCaptureDevice::new(Vec::new());
    let (_opens, closes) = device.counters();
    let mut manager = AudioCaptureManager::new(Box::new(device), CaptureProfile::default());

    manager.start_capture().await?;
    let blob = manager
        .stop_capture()
        .await?
        .expect("empty session still finalizes");

    assert_eq!(blob.sample_count, 0);
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn finalized_blob_is_a_readable_wav_file() -> Result<()> {
    let device = ScriptedCaptureDevice::new(vec![fragment(vec![100; 441])]);
    let mut manager = AudioCaptureManager::new(Box::new(device), CaptureProfile::default());

    manager.start_capture().await?;
    let blob = manager.stop_capture().await?.expect("blob");

    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("recording.wav");
    fs::write(&path, &blob.bytes)?;

    let reader = hound::WavReader::open(&path)?;
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 44_100);
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(reader.len(), 441);

    Ok(())
}

#[test]
fn capture_profile_defaults_match_the_fixed_profile() {
    let profile = CaptureProfile::default();

    assert_eq!(profile.sample_rate, 44_100);
    assert_eq!(profile.channels, 1);
    assert!(profile.echo_cancellation);
    assert!(profile.noise_suppression);
    assert_eq!(profile.fragment_flush_ms, 1_000);
    assert_eq!(profile.samples_per_flush(), 44_100);
}
