use anyhow::{bail, Result};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pose_coach::clock::SystemClock;
use pose_coach::config::Config;
use pose_coach::feedback::SpeechWorker;
use pose_coach::recording::load_recording;
use pose_coach::{EngineError, FormEngine};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("usage: {} <recording.jsonl> [config.toml]", args[0]);
    }
    let recording_path = &args[1];
    let config_path = args.get(2).map(String::as_str).unwrap_or(CONFIG_PATH);

    let config = Config::load_or_default(config_path);
    let frames = load_recording(recording_path)?;

    info!("=== Pose Coach ({}) ===", env!("GIT_VERSION"));
    info!(
        exercise = %config.session.exercise,
        view = %config.session.view,
        persistence_ms = config.persistence.duration_ms,
        frames = frames.len(),
        "replaying {}",
        recording_path
    );

    let (channel, mut events, worker) =
        SpeechWorker::spawn(Duration::from_millis(config.feedback.speak_ms));
    let mut engine = FormEngine::new(&config, channel, SystemClock)?;

    let start = Instant::now();
    let mut last_feedback: Vec<String> = Vec::new();
    let mut skipped = 0usize;

    for frame in &frames {
        tokio::time::sleep_until(start + Duration::from_millis(frame.t_ms)).await;

        while let Ok(event) = events.try_recv() {
            engine.handle_channel_event(event);
        }

        let correctness = match engine.process_frame(&frame.keypoints) {
            Ok(c) => c,
            Err(e @ EngineError::FrameShape { .. }) => {
                warn!(t_ms = frame.t_ms, "skipping frame: {}", e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if correctness.feedback != last_feedback {
            if correctness.is_correct {
                info!(t_ms = frame.t_ms, "form OK");
            } else {
                info!(
                    t_ms = frame.t_ms,
                    parts = ?correctness.incorrect_parts,
                    "{}",
                    correctness.feedback.join(" / ")
                );
            }
            last_feedback = correctness.feedback.clone();
        }
    }

    if let Some(snapshot) = engine.snapshot(config.export.width, config.export.height) {
        snapshot.save(&config.export.output_path)?;
        info!("last frame saved to {}", config.export.output_path);
    }

    engine.stop();
    drop(engine);
    drop(events);
    if let Err(e) = worker.await {
        warn!("speech worker: {}", e);
    }

    info!(frames = frames.len(), skipped, "replay finished");
    Ok(())
}
