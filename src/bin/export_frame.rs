use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pose_coach::config::Config;
use pose_coach::evaluate::PoseEvaluator;
use pose_coach::export::FrameExport;
use pose_coach::pose::Pose;
use pose_coach::recording::load_recording;
use pose_coach::reference::ReferenceCatalog;
use pose_coach::tracker::PoseCorrectness;

const CONFIG_PATH: &str = "config.toml";

// Usage: export_frame <recording.jsonl> [frame_index] [config.toml]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        bail!("usage: {} <recording.jsonl> [frame_index] [config.toml]", args[0]);
    }
    let index: usize = match args.get(2) {
        Some(s) => s.parse().with_context(|| format!("invalid frame index: {}", s))?,
        None => 0,
    };
    let config = Config::load_or_default(args.get(3).map(String::as_str).unwrap_or(CONFIG_PATH));

    let catalog = ReferenceCatalog::builtin()?;
    config.validate(&catalog)?;

    let frames = load_recording(&args[1])?;
    let Some(frame) = frames.get(index) else {
        bail!("frame {} not found ({} frames)", index, frames.len());
    };

    let pose = Pose::from_model_output(&frame.keypoints)?;
    let evaluator = PoseEvaluator::new(catalog, config.evaluation.confidence_threshold);
    let violations = evaluator.evaluate(&pose, config.session.exercise, config.session.view)?;

    // 単一フレームなので持続判定は行わず、その場の違反をそのまま書き出す
    let correctness = PoseCorrectness {
        is_correct: violations.is_correct,
        incorrect_parts: violations.incorrect_parts.clone(),
        feedback: violations.feedback.clone(),
    };

    let export = FrameExport::capture(
        &pose,
        &correctness,
        config.session.exercise,
        config.session.view,
        config.export.width,
        config.export.height,
        evaluator.confidence_threshold(),
    );
    export.save(&config.export.output_path)?;

    info!(
        t_ms = frame.t_ms,
        is_correct = export.is_correct,
        "frame {} saved to {}",
        index,
        config.export.output_path
    );
    for message in &export.feedback {
        info!("  - {}", message);
    }
    Ok(())
}
