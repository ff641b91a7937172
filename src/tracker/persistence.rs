use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use crate::error::EngineError;
use crate::evaluate::{push_unique, ViolationSet};
use crate::pose::BodyPart;

pub const DEFAULT_PERSISTENCE: Duration = Duration::from_millis(2000);
pub const MIN_PERSISTENCE: Duration = Duration::from_millis(1000);
pub const MAX_PERSISTENCE: Duration = Duration::from_millis(5000);

/// 部位ごとの連続違反の記録
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorTrack {
    pub part: BodyPart,
    /// 違反が最初に観測された時刻
    pub start_time: Instant,
    pub observed_frames: u32,
    /// 持続時間を超えて報告対象になったか
    pub active: bool,
}

/// フレームをまたいで保持される判定結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoseCorrectness {
    pub is_correct: bool,
    pub incorrect_parts: BTreeSet<BodyPart>,
    pub feedback: Vec<String>,
}

impl Default for PoseCorrectness {
    fn default() -> Self {
        Self {
            is_correct: true,
            incorrect_parts: BTreeSet::new(),
            feedback: Vec::new(),
        }
    }
}

/// 瞬間的な違反をデバウンスして「アクティブ」な違反に変換する
///
/// 違反状態への移行は遅く（持続時間が必要）、解除は即時（正しいフレーム1つで消える）。
pub struct ErrorPersistence {
    duration: Duration,
    tracks: BTreeMap<BodyPart, ErrorTrack>,
}

impl ErrorPersistence {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            tracks: BTreeMap::new(),
        }
    }

    pub fn persistence_duration(&self) -> Duration {
        self.duration
    }

    /// 持続時間を変更する。既存のトラックは全て破棄
    pub fn set_persistence_duration(&mut self, duration: Duration) -> Result<(), EngineError> {
        if duration < MIN_PERSISTENCE || duration > MAX_PERSISTENCE {
            return Err(EngineError::PersistenceOutOfRange(duration));
        }
        self.duration = duration;
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
    }

    pub fn tracks(&self) -> impl Iterator<Item = &ErrorTrack> {
        self.tracks.values()
    }

    pub fn is_active(&self, part: BodyPart) -> bool {
        self.tracks.get(&part).is_some_and(|t| t.active)
    }

    /// 1フレーム分の違反を反映する。フレーム到着順に呼ぶこと
    pub fn update(&mut self, violations: &ViolationSet, now: Instant) -> PoseCorrectness {
        let current = &violations.incorrect_parts;

        // 正しいフレーム: 途中経過も含めて即時破棄
        self.tracks.retain(|part, track| {
            let keep = current.contains(part);
            if !keep && track.active {
                debug!(part = %part, "correction cleared");
            }
            keep
        });

        for &part in current {
            match self.tracks.entry(part) {
                Entry::Occupied(mut entry) => {
                    let track = entry.get_mut();
                    track.observed_frames = track.observed_frames.saturating_add(1);
                    let dwell = now.saturating_duration_since(track.start_time);
                    if !track.active && dwell >= self.duration {
                        track.active = true;
                        debug!(
                            part = %part,
                            dwell_ms = dwell.as_millis() as u64,
                            frames = track.observed_frames,
                            "correction activated"
                        );
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(ErrorTrack {
                        part,
                        start_time: now,
                        observed_frames: 1,
                        active: false,
                    });
                }
            }
        }

        self.correctness(violations)
    }

    fn correctness(&self, violations: &ViolationSet) -> PoseCorrectness {
        let incorrect_parts: BTreeSet<BodyPart> = self
            .tracks
            .values()
            .filter(|t| t.active)
            .map(|t| t.part)
            .collect();

        let mut feedback = Vec::new();
        for part in &incorrect_parts {
            if let Some(text) = violations.part_feedback.get(part) {
                push_unique(&mut feedback, text);
            }
        }
        if !incorrect_parts.is_empty() && !violations.general_feedback.is_empty() {
            push_unique(&mut feedback, &violations.general_feedback);
        }

        PoseCorrectness {
            is_correct: incorrect_parts.is_empty(),
            incorrect_parts,
            feedback,
        }
    }
}

impl Default for ErrorPersistence {
    fn default() -> Self {
        Self::new(DEFAULT_PERSISTENCE)
    }
}
