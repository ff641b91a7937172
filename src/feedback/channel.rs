//! Advisory channel seam and a tokio-backed speech worker.
//!
//! The dispatcher hands sessions off without waiting; the worker reports
//! progress back as [`ChannelEvent`]s that the frame loop drains each tick.

use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::prompt::AdvisorySession;
use crate::error::ChannelError;

/// Sink that speaks an advisory session.
pub trait AdvisoryChannel {
    /// Begin a session. Must return without waiting for speech to finish.
    fn start_session(&mut self, session: AdvisorySession) -> Result<(), ChannelError>;

    /// Stop the live session, if any.
    fn end_session(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Speaking,
    Listening,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Connected,
    Disconnected,
    Error(String),
    ModeChange(ChannelMode),
}

#[derive(Debug)]
enum WorkerCommand {
    Speak(AdvisorySession),
    Stop,
}

/// [`AdvisoryChannel`] backed by a bounded mpsc queue to a [`SpeechWorker`].
pub struct MpscChannel {
    commands: mpsc::Sender<WorkerCommand>,
}

impl AdvisoryChannel for MpscChannel {
    fn start_session(&mut self, session: AdvisorySession) -> Result<(), ChannelError> {
        self.commands
            .try_send(WorkerCommand::Speak(session))
            .map_err(|e| match e {
                TrySendError::Full(_) => ChannelError::Busy,
                TrySendError::Closed(_) => ChannelError::Closed,
            })
    }

    fn end_session(&mut self) {
        if let Err(e) = self.commands.try_send(WorkerCommand::Stop) {
            debug!("stop not delivered: {}", e);
        }
    }
}

/// Simulated speech sink: logs the session and holds it for `speak_for`.
pub struct SpeechWorker {
    speak_for: Duration,
    commands: mpsc::Receiver<WorkerCommand>,
    events: mpsc::Sender<ChannelEvent>,
}

impl SpeechWorker {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(speak_for: Duration) -> (MpscChannel, mpsc::Receiver<ChannelEvent>, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let (event_tx, event_rx) = mpsc::channel(16);
        let worker = Self {
            speak_for,
            commands: cmd_rx,
            events: event_tx,
        };
        let handle = tokio::spawn(worker.run());
        (MpscChannel { commands: cmd_tx }, event_rx, handle)
    }

    async fn run(mut self) {
        while let Some(cmd) = self.commands.recv().await {
            let session = match cmd {
                WorkerCommand::Speak(session) => session,
                WorkerCommand::Stop => continue,
            };

            if !self.emit(ChannelEvent::Connected).await {
                break;
            }
            self.emit(ChannelEvent::ModeChange(ChannelMode::Speaking)).await;
            info!(first_message = %session.first_message, "speaking");
            debug!(system_prompt = %session.system_prompt);

            let sleep = tokio::time::sleep(self.speak_for);
            tokio::pin!(sleep);
            let stopped = loop {
                tokio::select! {
                    _ = &mut sleep => break false,
                    cmd = self.commands.recv() => match cmd {
                        Some(WorkerCommand::Stop) | None => break true,
                        Some(WorkerCommand::Speak(_)) => {
                            warn!("session requested while speaking, dropped");
                        }
                    },
                }
            };

            if stopped {
                info!("session stopped");
                continue;
            }
            self.emit(ChannelEvent::ModeChange(ChannelMode::Listening)).await;
            if !self.emit(ChannelEvent::Disconnected).await {
                break;
            }
        }
        debug!("speech worker exiting");
    }

    async fn emit(&self, event: ChannelEvent) -> bool {
        self.events.send(event).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AdvisorySession {
        AdvisorySession {
            system_prompt: "coach".to_string(),
            first_message: "Keep your hips level".to_string(),
        }
    }

    #[tokio::test]
    async fn test_worker_reports_full_session() {
        let (mut channel, mut events, _handle) = SpeechWorker::spawn(Duration::from_millis(10));
        channel.start_session(session()).unwrap();

        assert_eq!(events.recv().await, Some(ChannelEvent::Connected));
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::ModeChange(ChannelMode::Speaking))
        );
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::ModeChange(ChannelMode::Listening))
        );
        assert_eq!(events.recv().await, Some(ChannelEvent::Disconnected));
    }

    #[tokio::test]
    async fn test_stop_suppresses_disconnect() {
        let (mut channel, mut events, _handle) = SpeechWorker::spawn(Duration::from_secs(60));
        channel.start_session(session()).unwrap();
        assert_eq!(events.recv().await, Some(ChannelEvent::Connected));
        assert_eq!(
            events.recv().await,
            Some(ChannelEvent::ModeChange(ChannelMode::Speaking))
        );

        channel.end_session();
        let next = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
        assert!(next.is_err(), "no event expected after stop, got {:?}", next);
    }

    #[tokio::test]
    async fn test_closed_worker_reports_closed() {
        let (mut channel, events, handle) = SpeechWorker::spawn(Duration::from_millis(1));
        handle.abort();
        let _ = handle.await;
        drop(events);
        assert_eq!(channel.start_session(session()), Err(ChannelError::Closed));
    }
}
