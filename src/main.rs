use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use robook_voice::session::user_facing_message;
use robook_voice::{
    AudioCaptureManager, Config, HttpQueryService, MicrophoneDevice, PlaybackCoordinator,
    RodioSink, SessionController, SessionError, Speaker,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "robook-voice", about = "Voice chat client for the Robook library assistant")]
struct Args {
    /// Config file (without extension), loaded via the config crate
    #[arg(long, default_value = "config/robook-voice")]
    config: String,

    /// Override the query service base URL
    #[arg(long)]
    server_url: Option<String>,

    /// Override the voice styling intensity (0.0 to 1.0)
    #[arg(long)]
    voice_effect: Option<f32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load_or_default(&args.config);
    if let Some(url) = args.server_url {
        cfg.service.server_url = url;
    }
    if let Some(effect) = args.voice_effect {
        cfg.chat.voice_effect = effect;
    }

    info!("Robook voice client v0.1.0");
    info!("Query service at {}", cfg.service.server_url);

    let service = Arc::new(HttpQueryService::new(
        &cfg.service.server_url,
        Duration::from_secs(cfg.service.request_timeout_secs),
    )?);
    let capture = AudioCaptureManager::new(
        Box::new(MicrophoneDevice::new()),
        cfg.audio.capture_profile(),
    );
    let playback = PlaybackCoordinator::new(Box::new(RodioSink::new()));

    let mut controller = SessionController::new(capture, service, playback);
    controller.set_voice_effect(cfg.chat.voice_effect);

    println!("روبوک - کتابخانه هوشمند");
    println!("/record  /stop  /effect <0..1>  /pause  /resume  /quit (anything else is a text query)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut printed = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/record" => {
                if let Err(e) = controller.start_recording().await {
                    report(&e);
                }
            }
            "/stop" => {
                if let Err(e) = controller.stop_recording().await {
                    report(&e);
                }
            }
            "/pause" => {
                if let Err(e) = controller.playback().pause().await {
                    warn!("pause failed: {e}");
                }
            }
            "/resume" => {
                if let Err(e) = controller.playback().resume().await {
                    warn!("resume failed: {e}");
                }
            }
            _ if line.starts_with("/effect") => {
                match line.trim_start_matches("/effect").trim().parse::<f32>() {
                    Ok(value) => {
                        controller.set_voice_effect(value);
                        println!("voice effect: {:.1}", controller.voice_effect());
                    }
                    Err(_) => println!("usage: /effect <0..1>"),
                }
            }
            text => {
                if let Err(e) = controller.submit_text(text).await {
                    report(&e);
                }
            }
        }

        for turn in &controller.history()[printed..] {
            let tag = match turn.speaker {
                Speaker::User => "you",
                Speaker::Assistant => "robook",
            };
            println!("[{tag}] {}", turn.text);
        }
        printed = controller.history().len();
    }

    Ok(())
}

fn report(err: &SessionError) {
    if let Some(message) = user_facing_message(err) {
        println!("{message}");
    }
}
