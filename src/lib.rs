pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod export;
pub mod feedback;
pub mod pose;
pub mod recording;
pub mod reference;
pub mod tracker;

pub use engine::FormEngine;
pub use error::{ChannelError, EngineError};
