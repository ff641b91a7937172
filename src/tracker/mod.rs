pub mod persistence;

pub use persistence::{
    ErrorPersistence, ErrorTrack, PoseCorrectness, DEFAULT_PERSISTENCE, MAX_PERSISTENCE,
    MIN_PERSISTENCE,
};
