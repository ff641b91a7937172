use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::EngineError;
use crate::feedback::DispatcherConfig;
use crate::reference::{Exercise, ReferenceCatalog, ViewAngle};
use crate::tracker::{MAX_PERSISTENCE, MIN_PERSISTENCE};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// 種目 (plank / chaturanga / downward_dog)
    #[serde(default = "default_exercise")]
    pub exercise: Exercise,
    /// カメラの向き (front / side)
    #[serde(default = "default_view")]
    pub view: ViewAngle,
}

fn default_exercise() -> Exercise { Exercise::Plank }
fn default_view() -> ViewAngle { ViewAngle::Side }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exercise: default_exercise(),
            view: default_view(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// キーポイント信頼度の閾値（これを超えたものだけ使う）
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

fn default_confidence_threshold() -> f64 { 0.3 }

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// 違反を報告するまでの継続時間（ミリ秒, 1000〜5000）
    #[serde(default = "default_persistence_ms")]
    pub duration_ms: u64,
}

fn default_persistence_ms() -> u64 { 2000 }

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_persistence_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// セッション間の最小間隔（ミリ秒）
    #[serde(default = "default_session_cooldown_ms")]
    pub session_cooldown_ms: u64,
    /// 起動直後のロック期間（ミリ秒）
    #[serde(default = "default_initial_lock_ms")]
    pub initial_lock_ms: u64,
    /// 正常終了後、次の要求を処理するまでの待ち（ミリ秒）
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// エラー後の再試行待ち（ミリ秒）
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// 音声ワーカーが1セッションを話す時間（ミリ秒）
    #[serde(default = "default_speak_ms")]
    pub speak_ms: u64,
}

fn default_session_cooldown_ms() -> u64 { 5000 }
fn default_initial_lock_ms() -> u64 { 10000 }
fn default_settle_delay_ms() -> u64 { 1000 }
fn default_error_backoff_ms() -> u64 { 3000 }
fn default_speak_ms() -> u64 { 4000 }

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            session_cooldown_ms: default_session_cooldown_ms(),
            initial_lock_ms: default_initial_lock_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            speak_ms: default_speak_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// ピクセル座標換算に使うフレーム幅
    #[serde(default = "default_width")]
    pub width: u32,
    /// ピクセル座標換算に使うフレーム高さ
    #[serde(default = "default_height")]
    pub height: u32,
    /// 保存先パス
    #[serde(default = "default_export_path")]
    pub output_path: String,
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_export_path() -> String { "pose_snapshot.json".to_string() }

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            output_path: default_export_path(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// 読めなければデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{:#}; using default config", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self, catalog: &ReferenceCatalog) -> Result<(), EngineError> {
        let threshold = self.evaluation.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::InvalidConfig(format!(
                "confidence_threshold {} outside 0.0..=1.0",
                threshold
            )));
        }

        let duration = self.persistence_duration();
        if duration < MIN_PERSISTENCE || duration > MAX_PERSISTENCE {
            return Err(EngineError::PersistenceOutOfRange(duration));
        }

        catalog.get(self.session.exercise, self.session.view)?;
        Ok(())
    }

    pub fn persistence_duration(&self) -> Duration {
        Duration::from_millis(self.persistence.duration_ms)
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            initial_lock: Duration::from_millis(self.feedback.initial_lock_ms),
            session_cooldown: Duration::from_millis(self.feedback.session_cooldown_ms),
            settle_delay: Duration::from_millis(self.feedback.settle_delay_ms),
            error_backoff: Duration::from_millis(self.feedback.error_backoff_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.session.exercise, Exercise::Plank);
        assert_eq!(config.session.view, ViewAngle::Side);
        assert_eq!(config.evaluation.confidence_threshold, 0.3);
        assert_eq!(config.persistence.duration_ms, 2000);
        assert_eq!(config.feedback.session_cooldown_ms, 5000);
        assert_eq!(config.feedback.initial_lock_ms, 10000);
        assert_eq!(config.dispatcher_config(), DispatcherConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: Config = toml::from_str(
            r#"
            [session]
            exercise = "chaturanga"
            view = "front"

            [persistence]
            duration_ms = 3500
            "#,
        )
        .unwrap();
        assert_eq!(config.session.exercise, Exercise::Chaturanga);
        assert_eq!(config.session.view, ViewAngle::Front);
        assert_eq!(config.persistence_duration(), Duration::from_millis(3500));
        assert_eq!(config.feedback.error_backoff_ms, 3000);
    }

    #[test]
    fn test_unknown_exercise_rejected_by_parser() {
        let result: Result<Config, _> = toml::from_str("[session]\nexercise = \"squat\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_ranges() {
        let catalog = ReferenceCatalog::builtin().unwrap();
        let mut config = Config::default();
        assert!(config.validate(&catalog).is_ok());

        config.persistence.duration_ms = 6000;
        assert!(matches!(
            config.validate(&catalog),
            Err(EngineError::PersistenceOutOfRange(_))
        ));

        config.persistence.duration_ms = 2000;
        config.evaluation.confidence_threshold = 1.5;
        assert!(matches!(config.validate(&catalog), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_missing_reference_pose() {
        let catalog = ReferenceCatalog::builtin().unwrap();
        let mut config = Config::default();
        config.session.exercise = Exercise::DownwardDog;
        config.session.view = ViewAngle::Front;
        assert!(matches!(
            config.validate(&catalog),
            Err(EngineError::NoReferencePose { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[evaluation]\nconfidence_threshold = 0.45").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.evaluation.confidence_threshold, 0.45);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("does/not/exist.toml");
        assert_eq!(config.persistence.duration_ms, 2000);
    }
}
