//! Reference poses: the geometric definition of correct form for each
//! exercise and camera view, as a typed, validated table.

mod catalog;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::pose::{AlignmentMethod, BodyPart};

/// Tolerance multiplier for re-checking a failed alignment on views known to
/// suffer from perspective skew. Calibration parameter.
pub const PERSPECTIVE_RECHECK_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exercise {
    Plank,
    Chaturanga,
    DownwardDog,
}

impl Exercise {
    pub const ALL: [Exercise; 3] = [Self::Plank, Self::Chaturanga, Self::DownwardDog];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plank => "plank",
            Self::Chaturanga => "chaturanga",
            Self::DownwardDog => "downward_dog",
        }
    }

    /// Human-facing name, e.g. "Downward dog".
    pub fn display_name(self) -> String {
        let spaced = self.as_str().replace('_', " ");
        let mut chars = spaced.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exercise {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| EngineError::UnknownExercise(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewAngle {
    Front,
    Side,
}

impl ViewAngle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Side => "side",
        }
    }
}

impl fmt::Display for ViewAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewAngle {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "front" => Ok(Self::Front),
            "side" => Ok(Self::Side),
            _ => Err(EngineError::UnknownViewAngle(s.to_string())),
        }
    }
}

/// Ordered body parts that should lie on one line.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentConstraint {
    pub parts: Vec<BodyPart>,
    pub tolerance: f64,
}

/// Angle at `joint` between the rays to `limbs.0` and `limbs.1`.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleConstraint {
    pub joint: BodyPart,
    pub limbs: (BodyPart, BodyPart),
    pub target_degrees: f64,
    pub tolerance_degrees: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePose {
    pub alignments: Vec<AlignmentConstraint>,
    pub angles: Vec<AngleConstraint>,
    pub alignment_method: AlignmentMethod,
    /// Re-check a failed alignment at `tolerance * factor` before reporting it.
    pub perspective_recheck: Option<f64>,
    /// Appended whenever an alignment fails, and last in the active feedback.
    pub general_feedback: String,
    pub corrections: BTreeMap<BodyPart, String>,
}

impl ReferencePose {
    pub fn correction(&self, part: BodyPart) -> Option<&str> {
        self.corrections.get(&part).map(String::as_str)
    }

    fn validate(&self, exercise: Exercise, view: ViewAngle) -> Result<(), EngineError> {
        let invalid = |msg: String| EngineError::InvalidCatalog(format!("{exercise}/{view}: {msg}"));

        for alignment in &self.alignments {
            if alignment.parts.len() < 3 {
                return Err(invalid(format!(
                    "alignment needs at least 3 parts, got {}",
                    alignment.parts.len()
                )));
            }
            for (i, part) in alignment.parts.iter().enumerate() {
                if alignment.parts[i + 1..].contains(part) {
                    return Err(invalid(format!("alignment repeats {part}")));
                }
            }
            if !alignment.tolerance.is_finite() || alignment.tolerance <= 0.0 {
                return Err(invalid(format!("alignment tolerance {}", alignment.tolerance)));
            }
        }

        for angle in &self.angles {
            let (a, c) = angle.limbs;
            if a == angle.joint || c == angle.joint || a == c {
                return Err(invalid(format!("angle at {} reuses a part", angle.joint)));
            }
            if !(angle.target_degrees > 0.0 && angle.target_degrees <= 180.0) {
                return Err(invalid(format!(
                    "angle target {} at {}",
                    angle.target_degrees, angle.joint
                )));
            }
            if !angle.tolerance_degrees.is_finite() || angle.tolerance_degrees <= 0.0 {
                return Err(invalid(format!(
                    "angle tolerance {} at {}",
                    angle.tolerance_degrees, angle.joint
                )));
            }
        }

        if let Some(factor) = self.perspective_recheck {
            if !factor.is_finite() || factor < 1.0 {
                return Err(invalid(format!("perspective recheck factor {factor}")));
            }
        }
        Ok(())
    }
}

/// Read-only `(exercise, view) -> ReferencePose` table.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    poses: HashMap<(Exercise, ViewAngle), ReferencePose>,
}

impl ReferenceCatalog {
    /// Build and validate a catalog.
    pub fn new(poses: HashMap<(Exercise, ViewAngle), ReferencePose>) -> Result<Self, EngineError> {
        for (&(exercise, view), pose) in &poses {
            pose.validate(exercise, view)?;
        }
        Ok(Self { poses })
    }

    /// The built-in yoga/fitness catalog.
    pub fn builtin() -> Result<Self, EngineError> {
        Self::new(catalog::builtin_poses())
    }

    pub fn get(&self, exercise: Exercise, view: ViewAngle) -> Result<&ReferencePose, EngineError> {
        self.poses
            .get(&(exercise, view))
            .ok_or(EngineError::NoReferencePose { exercise, view })
    }

    pub fn contains(&self, exercise: Exercise, view: ViewAngle) -> bool {
        self.poses.contains_key(&(exercise, view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pose() -> ReferencePose {
        ReferencePose {
            alignments: vec![AlignmentConstraint {
                parts: vec![BodyPart::LeftShoulder, BodyPart::LeftHip, BodyPart::LeftAnkle],
                tolerance: 0.2,
            }],
            angles: vec![],
            alignment_method: AlignmentMethod::Slope,
            perspective_recheck: None,
            general_feedback: "Keep a straight line".to_string(),
            corrections: BTreeMap::new(),
        }
    }

    #[test]
    fn test_builtin_catalog_validates() {
        let catalog = ReferenceCatalog::builtin().unwrap();
        assert!(catalog.contains(Exercise::Plank, ViewAngle::Side));
        assert!(catalog.contains(Exercise::Chaturanga, ViewAngle::Front));
    }

    #[test]
    fn test_unknown_combination_fails_fast() {
        let catalog = ReferenceCatalog::builtin().unwrap();
        match catalog.get(Exercise::DownwardDog, ViewAngle::Front) {
            Err(EngineError::NoReferencePose { exercise, view }) => {
                assert_eq!(exercise, Exercise::DownwardDog);
                assert_eq!(view, ViewAngle::Front);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_short_alignment_rejected() {
        let mut pose = minimal_pose();
        pose.alignments[0].parts.pop();
        let poses = HashMap::from([((Exercise::Plank, ViewAngle::Side), pose)]);
        assert!(matches!(
            ReferenceCatalog::new(poses),
            Err(EngineError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn test_repeated_alignment_part_rejected() {
        let mut pose = minimal_pose();
        pose.alignments[0].parts[2] = BodyPart::LeftShoulder;
        let poses = HashMap::from([((Exercise::Plank, ViewAngle::Side), pose)]);
        assert!(ReferenceCatalog::new(poses).is_err());
    }

    #[test]
    fn test_bad_angle_target_rejected() {
        let mut pose = minimal_pose();
        pose.angles.push(AngleConstraint {
            joint: BodyPart::LeftElbow,
            limbs: (BodyPart::LeftShoulder, BodyPart::LeftWrist),
            target_degrees: 200.0,
            tolerance_degrees: 10.0,
        });
        let poses = HashMap::from([((Exercise::Plank, ViewAngle::Side), pose)]);
        assert!(ReferenceCatalog::new(poses).is_err());
    }

    #[test]
    fn test_exercise_parse_and_display() {
        assert_eq!("downward_dog".parse::<Exercise>().unwrap(), Exercise::DownwardDog);
        assert_eq!(Exercise::Plank.to_string(), "plank");
        assert_eq!(Exercise::DownwardDog.display_name(), "Downward dog");
        assert!("squat".parse::<Exercise>().is_err());
        assert_eq!("side".parse::<ViewAngle>().unwrap(), ViewAngle::Side);
        assert!("top".parse::<ViewAngle>().is_err());
    }
}
