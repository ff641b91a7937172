pub mod channel;
pub mod dispatcher;
pub mod prompt;

pub use channel::{AdvisoryChannel, ChannelEvent, ChannelMode, MpscChannel, SpeechWorker};
pub use dispatcher::{
    DispatcherConfig, DispatcherState, FeedbackDispatcher, FeedbackRequest, FeedbackStatus,
};
pub use prompt::AdvisorySession;
