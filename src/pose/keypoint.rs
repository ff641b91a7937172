use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// MoveNet の 17 キーポイント（身体部位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum BodyPart {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl BodyPart {
    pub const COUNT: usize = 17;

    pub const ALL: [BodyPart; BodyPart::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// snake_case の部位名 (例: "right_shoulder")
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for BodyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BodyPart {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|part| part.name() == s)
            .ok_or_else(|| EngineError::UnknownBodyPart(s.to_string()))
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f64,
    /// 正規化されたY座標 (0.0〜1.0)
    pub y: f64,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値を超えているか（閾値ちょうどは無効）
    pub fn is_valid(&self, threshold: f64) -> bool {
        self.confidence > threshold
    }

    /// ピクセル座標に変換
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        let px = (self.x * width as f64) as i32;
        let py = (self.y * height as f64) as i32;
        (px, py)
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            confidence: 0.0,
        }
    }
}

/// 17キーポイントからなる姿勢（1フレーム分）
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub keypoints: [Keypoint; BodyPart::COUNT],
}

impl Pose {
    pub fn new(keypoints: [Keypoint; BodyPart::COUNT]) -> Self {
        Self { keypoints }
    }

    /// モデル出力 `[y, x, score]` × 17 から変換
    pub fn from_model_output(rows: &[[f64; 3]]) -> Result<Self, EngineError> {
        if rows.len() != BodyPart::COUNT {
            return Err(EngineError::FrameShape {
                expected: BodyPart::COUNT,
                actual: rows.len(),
            });
        }

        let mut keypoints = [Keypoint::default(); BodyPart::COUNT];
        for (kp, &[y, x, score]) in keypoints.iter_mut().zip(rows) {
            *kp = Keypoint::new(x, y, score);
        }
        Ok(Self::new(keypoints))
    }

    /// 部位でキーポイントを取得
    pub fn get(&self, part: BodyPart) -> &Keypoint {
        &self.keypoints[part as usize]
    }

    /// 部位名つきで全キーポイントを列挙
    pub fn iter(&self) -> impl Iterator<Item = (BodyPart, &Keypoint)> {
        BodyPart::ALL.iter().copied().zip(self.keypoints.iter())
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            keypoints: [Keypoint::default(); BodyPart::COUNT],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_part_count() {
        assert_eq!(BodyPart::COUNT, 17);
        assert_eq!(BodyPart::ALL.len(), BodyPart::COUNT);
    }

    #[test]
    fn test_body_part_from_index() {
        assert_eq!(BodyPart::from_index(0), Some(BodyPart::Nose));
        assert_eq!(BodyPart::from_index(16), Some(BodyPart::RightAnkle));
        assert_eq!(BodyPart::from_index(17), None);
    }

    #[test]
    fn test_body_part_name_roundtrip() {
        for part in BodyPart::ALL {
            assert_eq!(part.name().parse::<BodyPart>().unwrap(), part);
        }
        assert!("left_toe".parse::<BodyPart>().is_err());
    }

    #[test]
    fn test_keypoint_is_valid_strict() {
        let kp = Keypoint::new(0.5, 0.5, 0.3);
        assert!(!kp.is_valid(0.3));
        assert!(kp.is_valid(0.29));
    }

    #[test]
    fn test_keypoint_to_pixel() {
        let kp = Keypoint::new(0.5, 0.25, 1.0);
        assert_eq!(kp.to_pixel(640, 480), (320, 120));
    }

    #[test]
    fn test_from_model_output_swaps_axes() {
        let mut rows = [[0.0; 3]; BodyPart::COUNT];
        rows[BodyPart::Nose as usize] = [0.3, 0.5, 0.9];

        let pose = Pose::from_model_output(&rows).unwrap();
        let nose = pose.get(BodyPart::Nose);
        assert_eq!(nose.x, 0.5);
        assert_eq!(nose.y, 0.3);
        assert_eq!(nose.confidence, 0.9);
    }

    #[test]
    fn test_from_model_output_rejects_short_frame() {
        let rows = [[0.0; 3]; 16];
        match Pose::from_model_output(&rows) {
            Err(EngineError::FrameShape { expected, actual }) => {
                assert_eq!(expected, 17);
                assert_eq!(actual, 16);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_pose_iter_is_name_keyed() {
        let pose = Pose::default();
        let names: Vec<&str> = pose.iter().map(|(part, _)| part.name()).collect();
        assert_eq!(names.first(), Some(&"nose"));
        assert_eq!(names.last(), Some(&"right_ankle"));
    }
}
