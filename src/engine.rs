//! One coaching session: evaluation, debouncing and feedback dispatch for a
//! single tracked subject, driven by the host's per-frame tick.

use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::EngineError;
use crate::evaluate::PoseEvaluator;
use crate::export::FrameExport;
use crate::feedback::{AdvisoryChannel, ChannelEvent, FeedbackDispatcher, FeedbackRequest};
use crate::pose::{BodyPart, Pose};
use crate::reference::{Exercise, ReferenceCatalog, ViewAngle};
use crate::tracker::{ErrorPersistence, PoseCorrectness};

pub struct FormEngine<A, C = SystemClock> {
    evaluator: PoseEvaluator,
    persistence: ErrorPersistence,
    dispatcher: FeedbackDispatcher<A>,
    clock: C,
    exercise: Exercise,
    view: ViewAngle,
    correctness: PoseCorrectness,
    /// Active set most recently accepted by the dispatcher.
    announced: Option<BTreeSet<BodyPart>>,
    last_pose: Option<Pose>,
}

impl<A: AdvisoryChannel, C: Clock> FormEngine<A, C> {
    pub fn new(config: &Config, channel: A, clock: C) -> Result<Self, EngineError> {
        Self::with_catalog(config, ReferenceCatalog::builtin()?, channel, clock)
    }

    pub fn with_catalog(
        config: &Config,
        catalog: ReferenceCatalog,
        channel: A,
        clock: C,
    ) -> Result<Self, EngineError> {
        config.validate(&catalog)?;

        let now = clock.now();
        Ok(Self {
            evaluator: PoseEvaluator::new(catalog, config.evaluation.confidence_threshold),
            persistence: ErrorPersistence::new(config.persistence_duration()),
            dispatcher: FeedbackDispatcher::new(channel, config.dispatcher_config(), now),
            clock,
            exercise: config.session.exercise,
            view: config.session.view,
            correctness: PoseCorrectness::default(),
            announced: None,
            last_pose: None,
        })
    }

    /// Process one model output frame (`[y, x, score]` × 17).
    pub fn process_frame(&mut self, rows: &[[f64; 3]]) -> Result<&PoseCorrectness, EngineError> {
        let pose = Pose::from_model_output(rows)?;
        self.process_pose(pose)
    }

    pub fn process_pose(&mut self, pose: Pose) -> Result<&PoseCorrectness, EngineError> {
        let now = self.clock.now();

        let violations = self.evaluator.evaluate(&pose, self.exercise, self.view)?;
        let correctness = self.persistence.update(&violations, now);

        if correctness.is_correct {
            self.announced = None;
        } else if self.announced.as_ref() != Some(&correctness.incorrect_parts) {
            let request = FeedbackRequest {
                exercise: self.exercise,
                incorrect_parts: correctness.incorrect_parts.iter().copied().collect(),
                feedback: correctness.feedback.clone(),
                enqueued_at: now,
            };
            if self.dispatcher.queue(request, now) {
                debug!(parts = ?correctness.incorrect_parts, "feedback queued");
                self.announced = Some(correctness.incorrect_parts.clone());
            }
        }

        self.correctness = correctness;
        self.dispatcher.flush(now);
        self.last_pose = Some(pose);
        Ok(&self.correctness)
    }

    /// Feed an advisory channel event back into the dispatcher.
    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        let now = self.clock.now();
        self.dispatcher.handle_event(event, now);
        self.dispatcher.flush(now);
    }

    /// Change the dwell time. All tracks are discarded.
    pub fn set_persistence_duration(&mut self, duration: Duration) -> Result<(), EngineError> {
        self.persistence.set_persistence_duration(duration)?;
        self.correctness = PoseCorrectness::default();
        self.announced = None;
        info!(duration_ms = duration.as_millis() as u64, "persistence duration changed");
        Ok(())
    }

    /// Switch exercise or camera view. Tracks and queued feedback are discarded.
    pub fn set_exercise(&mut self, exercise: Exercise, view: ViewAngle) -> Result<(), EngineError> {
        self.evaluator.catalog().get(exercise, view)?;
        self.exercise = exercise;
        self.view = view;
        self.clear();
        info!(%exercise, %view, "exercise changed");
        Ok(())
    }

    /// Stop detection: drop all in-flight state without draining.
    pub fn stop(&mut self) {
        self.clear();
        info!("detection stopped");
    }

    fn clear(&mut self) {
        self.persistence.reset();
        self.dispatcher.cancel();
        self.correctness = PoseCorrectness::default();
        self.announced = None;
        self.last_pose = None;
    }

    pub fn correctness(&self) -> &PoseCorrectness {
        &self.correctness
    }

    pub fn exercise(&self) -> Exercise {
        self.exercise
    }

    pub fn view(&self) -> ViewAngle {
        self.view
    }

    pub fn persistence(&self) -> &ErrorPersistence {
        &self.persistence
    }

    pub fn dispatcher(&self) -> &FeedbackDispatcher<A> {
        &self.dispatcher
    }

    pub fn last_pose(&self) -> Option<&Pose> {
        self.last_pose.as_ref()
    }

    /// Export the most recent frame, if one has been processed since start or stop.
    pub fn snapshot(&self, width: u32, height: u32) -> Option<FrameExport> {
        let pose = self.last_pose.as_ref()?;
        Some(FrameExport::capture(
            pose,
            &self.correctness,
            self.exercise,
            self.view,
            width,
            height,
            self.evaluator.confidence_threshold(),
        ))
    }
}
