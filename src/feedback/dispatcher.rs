use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::channel::{AdvisoryChannel, ChannelEvent, ChannelMode};
use super::prompt::AdvisorySession;
use crate::pose::BodyPart;
use crate::reference::Exercise;

/// A set of active corrections waiting to be spoken.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRequest {
    pub exercise: Exercise,
    pub incorrect_parts: Vec<BodyPart>,
    pub feedback: Vec<String>,
    pub enqueued_at: Instant,
}

impl FeedbackRequest {
    /// Requests with the same sorted message set are equivalent.
    fn key(&self) -> Vec<String> {
        let mut key = self.feedback.clone();
        key.sort();
        key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Start-up lock before anything may be queued.
    pub initial_lock: Duration,
    /// Minimum gap between dispatched sessions.
    pub session_cooldown: Duration,
    /// Pause after a clean disconnect before the next queued request.
    pub settle_delay: Duration,
    /// Pause after a channel failure before retrying the queue.
    pub error_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            initial_lock: Duration::from_millis(10_000),
            session_cooldown: Duration::from_millis(5_000),
            settle_delay: Duration::from_millis(1_000),
            error_backoff: Duration::from_millis(3_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Locked,
    Idle,
    Speaking,
}

/// Indicator shown next to the video feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackStatus {
    Inactive,
    Speaking,
    Listening,
    Error,
}

/// Throttles active corrections into the advisory channel: one session at a
/// time, a cooldown between sessions, and no duplicate message sets.
pub struct FeedbackDispatcher<A> {
    channel: A,
    config: DispatcherConfig,
    unlock_at: Instant,
    queue: VecDeque<FeedbackRequest>,
    /// Key of the session currently speaking.
    speaking: Option<Vec<String>>,
    last_dispatch: Option<Instant>,
    resume_at: Option<Instant>,
    status: FeedbackStatus,
}

impl<A: AdvisoryChannel> FeedbackDispatcher<A> {
    pub fn new(channel: A, config: DispatcherConfig, now: Instant) -> Self {
        Self {
            channel,
            config,
            unlock_at: now + config.initial_lock,
            queue: VecDeque::new(),
            speaking: None,
            last_dispatch: None,
            resume_at: None,
            status: FeedbackStatus::Inactive,
        }
    }

    /// `Idle` also covers a pending settle or error backoff; see [`Self::resume_at`].
    pub fn state(&self, now: Instant) -> DispatcherState {
        if now < self.unlock_at {
            DispatcherState::Locked
        } else if self.speaking.is_some() {
            DispatcherState::Speaking
        } else {
            DispatcherState::Idle
        }
    }

    pub fn status(&self) -> FeedbackStatus {
        self.status
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// When queued requests may start again after a disconnect or failure.
    pub fn resume_at(&self) -> Option<Instant> {
        self.resume_at
    }

    pub fn last_dispatch(&self) -> Option<Instant> {
        self.last_dispatch
    }

    pub fn channel(&self) -> &A {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut A {
        &mut self.channel
    }

    /// Try to queue a request. Returns whether it was accepted.
    pub fn queue(&mut self, request: FeedbackRequest, now: Instant) -> bool {
        if now < self.unlock_at {
            debug!("feedback locked, request dropped");
            return false;
        }
        if let Some(last) = self.last_dispatch {
            if now.saturating_duration_since(last) < self.config.session_cooldown {
                debug!("feedback cooling down, request dropped");
                return false;
            }
        }

        let key = request.key();
        if self.speaking.as_ref() == Some(&key) || self.queue.iter().any(|r| r.key() == key) {
            debug!("duplicate feedback request dropped");
            return false;
        }

        self.queue.push_back(request);
        if self.speaking.is_none() && self.resume_due(now) {
            self.process_next(now);
        }
        true
    }

    /// Start the next queued request if the channel is free and any pending
    /// delay has elapsed. Call once per tick.
    pub fn flush(&mut self, now: Instant) {
        if now < self.unlock_at || self.speaking.is_some() || !self.resume_due(now) {
            return;
        }
        self.resume_at = None;
        self.process_next(now);
    }

    pub fn handle_event(&mut self, event: ChannelEvent, now: Instant) {
        match event {
            ChannelEvent::Connected => {
                debug!("advisory channel connected");
                self.status = FeedbackStatus::Speaking;
            }
            ChannelEvent::ModeChange(mode) => {
                debug!(?mode, "advisory channel mode changed");
                self.status = match mode {
                    ChannelMode::Speaking => FeedbackStatus::Speaking,
                    ChannelMode::Listening => FeedbackStatus::Listening,
                };
            }
            ChannelEvent::Disconnected => {
                if self.speaking.take().is_some() {
                    debug!("advisory session finished");
                    self.finish(now, self.config.settle_delay);
                    self.status = FeedbackStatus::Inactive;
                }
            }
            ChannelEvent::Error(message) => {
                if self.speaking.take().is_some() {
                    warn!("advisory channel error: {}", message);
                    self.finish(now, self.config.error_backoff);
                    self.status = FeedbackStatus::Error;
                } else {
                    debug!("channel error with no live session ignored: {}", message);
                }
            }
        }
    }

    /// Drop everything queued and stop any live session. No drain.
    pub fn cancel(&mut self) {
        if self.speaking.take().is_some() {
            self.channel.end_session();
        }
        self.queue.clear();
        self.resume_at = None;
        self.status = FeedbackStatus::Inactive;
    }

    fn resume_due(&self, now: Instant) -> bool {
        self.resume_at.map_or(true, |at| now >= at)
    }

    fn finish(&mut self, now: Instant, delay: Duration) {
        self.last_dispatch = Some(now);
        self.resume_at = Some(now + delay);
    }

    fn process_next(&mut self, now: Instant) {
        let Some(request) = self.queue.pop_front() else {
            return;
        };
        self.last_dispatch = Some(now);

        let session = AdvisorySession::from_request(&request);
        info!(
            exercise = %request.exercise,
            first_message = %session.first_message,
            "starting advisory session"
        );

        match self.channel.start_session(session) {
            Ok(()) => {
                self.speaking = Some(request.key());
            }
            Err(e) => {
                warn!("failed to start advisory session: {}", e);
                self.status = FeedbackStatus::Error;
                self.resume_at = Some(now + self.config.error_backoff);
            }
        }
    }
}
