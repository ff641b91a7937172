use std::collections::{BTreeMap, HashMap};

use super::{
    AlignmentConstraint, AngleConstraint, Exercise, ReferencePose, ViewAngle,
    PERSPECTIVE_RECHECK_FACTOR,
};
use crate::pose::{AlignmentMethod, BodyPart};

fn line(parts: &[BodyPart], tolerance: f64) -> AlignmentConstraint {
    AlignmentConstraint {
        parts: parts.to_vec(),
        tolerance,
    }
}

fn angle(joint: BodyPart, a: BodyPart, c: BodyPart, target: f64, tolerance: f64) -> AngleConstraint {
    AngleConstraint {
        joint,
        limbs: (a, c),
        target_degrees: target,
        tolerance_degrees: tolerance,
    }
}

fn corrections(entries: &[(BodyPart, &str)]) -> BTreeMap<BodyPart, String> {
    entries
        .iter()
        .map(|&(part, text)| (part, text.to_string()))
        .collect()
}

pub(super) fn builtin_poses() -> HashMap<(Exercise, ViewAngle), ReferencePose> {
    use BodyPart::*;

    let mut poses = HashMap::new();

    // 横から見たプランク: 肩-腰-足首が一直線、肩は肘の真上
    // カメラ位置で傾きが歪みやすいので1.5倍で再チェック
    poses.insert(
        (Exercise::Plank, ViewAngle::Side),
        ReferencePose {
            alignments: vec![line(&[RightShoulder, RightHip, RightAnkle], 0.25)],
            angles: vec![
                angle(RightShoulder, RightElbow, RightHip, 85.0, 30.0),
                angle(RightHip, RightShoulder, RightKnee, 175.0, 15.0),
                angle(RightKnee, RightHip, RightAnkle, 175.0, 15.0),
            ],
            alignment_method: AlignmentMethod::Slope,
            perspective_recheck: Some(PERSPECTIVE_RECHECK_FACTOR),
            general_feedback: "Keep your body in a straight line from head to heels".to_string(),
            corrections: corrections(&[
                (RightShoulder, "Stack your shoulders directly over your elbows"),
                (RightHip, "Keep your hips level with your shoulders"),
                (RightKnee, "Straighten your legs and engage your quads"),
            ]),
        },
    );

    poses.insert(
        (Exercise::Plank, ViewAngle::Front),
        ReferencePose {
            alignments: vec![
                line(&[LeftShoulder, LeftElbow, LeftWrist], 0.05),
                line(&[RightShoulder, RightElbow, RightWrist], 0.05),
            ],
            angles: vec![
                angle(LeftElbow, LeftShoulder, LeftWrist, 170.0, 20.0),
                angle(RightElbow, RightShoulder, RightWrist, 170.0, 20.0),
            ],
            alignment_method: AlignmentMethod::Regression,
            perspective_recheck: None,
            general_feedback: "Keep your arms vertical under your shoulders".to_string(),
            corrections: corrections(&[
                (LeftElbow, "Straighten your left arm"),
                (RightElbow, "Straighten your right arm"),
                (LeftWrist, "Bring your left hand under your shoulder"),
                (RightWrist, "Bring your right hand under your shoulder"),
            ]),
        },
    );

    poses.insert(
        (Exercise::Chaturanga, ViewAngle::Side),
        ReferencePose {
            alignments: vec![line(&[RightShoulder, RightHip, RightAnkle], 0.2)],
            angles: vec![
                angle(RightElbow, RightShoulder, RightWrist, 90.0, 20.0),
                angle(RightShoulder, RightElbow, RightHip, 30.0, 20.0),
                angle(RightHip, RightShoulder, RightKnee, 175.0, 15.0),
            ],
            alignment_method: AlignmentMethod::Slope,
            perspective_recheck: None,
            general_feedback: "Lower as one straight unit without sagging".to_string(),
            corrections: corrections(&[
                (RightElbow, "Bend your elbows to 90 degrees"),
                (RightShoulder, "Keep your elbows tucked close to your ribs"),
                (RightHip, "Don't let your hips sag or pike"),
            ]),
        },
    );

    poses.insert(
        (Exercise::Chaturanga, ViewAngle::Front),
        ReferencePose {
            alignments: vec![line(&[LeftShoulder, Nose, RightShoulder], 0.15)],
            angles: vec![
                angle(LeftElbow, LeftShoulder, LeftWrist, 90.0, 20.0),
                angle(RightElbow, RightShoulder, RightWrist, 90.0, 20.0),
            ],
            alignment_method: AlignmentMethod::Slope,
            perspective_recheck: None,
            general_feedback: "Keep your shoulders level as you lower".to_string(),
            corrections: corrections(&[
                (LeftElbow, "Bend your left elbow to 90 degrees"),
                (RightElbow, "Bend your right elbow to 90 degrees"),
                (LeftShoulder, "Don't drop your left shoulder"),
                (RightShoulder, "Don't drop your right shoulder"),
            ]),
        },
    );

    // 正面からのダウンドッグは未定義（腰の角度が見えない）
    poses.insert(
        (Exercise::DownwardDog, ViewAngle::Side),
        ReferencePose {
            alignments: vec![line(&[RightWrist, RightElbow, RightShoulder], 0.03)],
            angles: vec![
                angle(RightHip, RightShoulder, RightKnee, 70.0, 20.0),
                angle(RightKnee, RightHip, RightAnkle, 170.0, 20.0),
                angle(RightShoulder, RightElbow, RightHip, 170.0, 20.0),
            ],
            alignment_method: AlignmentMethod::Regression,
            perspective_recheck: None,
            general_feedback: "Press through your hands and lengthen your spine".to_string(),
            corrections: corrections(&[
                (RightHip, "Lift your hips higher toward the ceiling"),
                (RightKnee, "Straighten your knees if you can"),
                (RightShoulder, "Press your chest back toward your thighs"),
                (RightElbow, "Keep your arms straight"),
            ]),
        },
    );

    poses
}
