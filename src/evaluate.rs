//! Single-frame form evaluation against a reference pose.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::error::EngineError;
use crate::pose::{angle_between, is_aligned, is_degenerate, BodyPart, Keypoint, Pose};
use crate::reference::{
    AlignmentConstraint, AngleConstraint, Exercise, ReferenceCatalog, ReferencePose, ViewAngle,
};

/// Default minimum keypoint confidence for a constraint to be evaluated.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.3;

/// Instantaneous result for one frame. Recomputed every frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViolationSet {
    pub incorrect_parts: BTreeSet<BodyPart>,
    /// Deduplicated, in insertion order.
    pub feedback: Vec<String>,
    pub is_correct: bool,
    /// Registered correction for each violated part that has one.
    pub part_feedback: BTreeMap<BodyPart, String>,
    pub general_feedback: String,
}

pub(crate) fn push_unique(list: &mut Vec<String>, message: &str) {
    if !list.iter().any(|m| m == message) {
        list.push(message.to_string());
    }
}

pub struct PoseEvaluator {
    catalog: ReferenceCatalog,
    confidence_threshold: f64,
}

impl PoseEvaluator {
    pub fn new(catalog: ReferenceCatalog, confidence_threshold: f64) -> Self {
        Self {
            catalog,
            confidence_threshold,
        }
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn evaluate(
        &self,
        pose: &Pose,
        exercise: Exercise,
        view: ViewAngle,
    ) -> Result<ViolationSet, EngineError> {
        let reference = self.catalog.get(exercise, view)?;

        let mut result = ViolationSet {
            general_feedback: reference.general_feedback.clone(),
            ..ViolationSet::default()
        };

        for alignment in &reference.alignments {
            if self.alignment_violated(pose, reference, alignment) {
                result.incorrect_parts.extend(alignment.parts.iter().copied());
                push_unique(&mut result.feedback, &reference.general_feedback);
            }
        }

        for constraint in &reference.angles {
            if self.angle_violated(pose, constraint) {
                result.incorrect_parts.insert(constraint.joint);
                if let Some(text) = reference.correction(constraint.joint) {
                    push_unique(&mut result.feedback, text);
                }
            }
        }

        for &part in &result.incorrect_parts {
            if let Some(text) = reference.correction(part) {
                result.part_feedback.insert(part, text.to_string());
            }
        }
        result.is_correct = result.incorrect_parts.is_empty();
        Ok(result)
    }

    /// 全部位が閾値を超えていれば座標を返す
    fn confident_points(&self, pose: &Pose, parts: &[BodyPart]) -> Option<Vec<Keypoint>> {
        parts
            .iter()
            .map(|&part| {
                let kp = pose.get(part);
                kp.is_valid(self.confidence_threshold).then_some(*kp)
            })
            .collect()
    }

    fn alignment_violated(
        &self,
        pose: &Pose,
        reference: &ReferencePose,
        alignment: &AlignmentConstraint,
    ) -> bool {
        let Some(points) = self.confident_points(pose, &alignment.parts) else {
            return false;
        };
        if points.len() < 3 {
            return false;
        }

        let method = reference.alignment_method;
        if is_aligned(method, &points, alignment.tolerance) {
            return false;
        }

        if let Some(factor) = reference.perspective_recheck {
            if is_aligned(method, &points, alignment.tolerance * factor) {
                trace!(
                    parts = ?alignment.parts,
                    "alignment passed perspective recheck"
                );
                return false;
            }
        }
        true
    }

    fn angle_violated(&self, pose: &Pose, constraint: &AngleConstraint) -> bool {
        let (a, c) = constraint.limbs;
        let Some(points) = self.confident_points(pose, &[a, constraint.joint, c]) else {
            return false;
        };
        let (a, b, c) = (&points[0], &points[1], &points[2]);

        if is_degenerate(a, b, c) {
            trace!(joint = %constraint.joint, "skipping degenerate angle");
            return false;
        }

        let measured = angle_between(a, b, c);
        (measured - constraint.target_degrees).abs() > constraint.tolerance_degrees
    }
}
