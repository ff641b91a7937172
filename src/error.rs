use std::time::Duration;

use thiserror::Error;

use crate::reference::{Exercise, ViewAngle};

/// Errors surfaced by the frame-processing path and its configuration.
///
/// Missing keypoints and degenerate geometry are not errors: the affected
/// constraint is skipped.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no reference pose for {exercise} ({view} view)")]
    NoReferencePose { exercise: Exercise, view: ViewAngle },

    #[error("frame has {actual} keypoints, expected {expected}")]
    FrameShape { expected: usize, actual: usize },

    #[error("unknown body part: {0}")]
    UnknownBodyPart(String),

    #[error("unknown exercise: {0}")]
    UnknownExercise(String),

    #[error("unknown view angle: {0}")]
    UnknownViewAngle(String),

    #[error("persistence duration {0:?} outside 1000..=5000 ms")]
    PersistenceOutOfRange(Duration),

    #[error("invalid reference catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Advisory channel failures. Never fatal; the dispatcher backs off and retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("advisory channel is busy")]
    Busy,

    #[error("advisory channel closed")]
    Closed,

    #[error("advisory channel transport error: {0}")]
    Transport(String),
}
