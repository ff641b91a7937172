pub mod geometry;
pub mod keypoint;

pub use geometry::{angle_between, is_aligned, is_degenerate, AlignmentMethod};
pub use keypoint::{BodyPart, Keypoint, Pose};
