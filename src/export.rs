use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::pose::{BodyPart, Pose};
use crate::reference::{Exercise, ViewAngle};
use crate::tracker::PoseCorrectness;

// --- データ構造 ---

/// 1キーポイント分の書き出し
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeypointExport {
    pub name: BodyPart,
    /// 正規化座標
    pub x: f64,
    pub y: f64,
    /// ピクセル座標
    pub pixel_x: i32,
    pub pixel_y: i32,
    pub confidence: f64,
    /// 信頼度が閾値を超えているか
    pub visible: bool,
    /// アクティブな違反に含まれていないか
    pub correct: bool,
}

/// 1フレームのスナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameExport {
    pub exercise: Exercise,
    pub view_angle: ViewAngle,
    /// RFC 3339
    pub timestamp: String,
    pub width: u32,
    pub height: u32,
    pub is_correct: bool,
    pub feedback: Vec<String>,
    pub keypoints: Vec<KeypointExport>,
}

impl FrameExport {
    pub fn capture(
        pose: &Pose,
        correctness: &PoseCorrectness,
        exercise: Exercise,
        view: ViewAngle,
        width: u32,
        height: u32,
        confidence_threshold: f64,
    ) -> Self {
        let keypoints = pose
            .iter()
            .map(|(part, kp)| {
                let (pixel_x, pixel_y) = kp.to_pixel(width, height);
                KeypointExport {
                    name: part,
                    x: kp.x,
                    y: kp.y,
                    pixel_x,
                    pixel_y,
                    confidence: kp.confidence,
                    visible: kp.is_valid(confidence_threshold),
                    correct: !correctness.incorrect_parts.contains(&part),
                }
            })
            .collect();

        Self {
            exercise,
            view_angle: view,
            timestamp: chrono::Local::now().to_rfc3339(),
            width,
            height,
            is_correct: correctness.is_correct,
            feedback: correctness.feedback.clone(),
            keypoints,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    // --- Save / Load ---

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json_pretty()?;
        fs::write(path, json).context("Failed to write pose snapshot")?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read pose snapshot")?;
        let export: FrameExport = serde_json::from_str(&content)?;
        Ok(export)
    }
}
