use crate::{
    keypoints::distance,
    types::{KeypointName, PoseFrame},
};

const FRONT_OFFSET_RATIO: f32 = 0.2;
const THREE_QUARTER_OFFSET_RATIO: f32 = 0.4;

/// Scalar body measurements in frame pixels; `None` when landmarks are missing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BodyMeasurements {
    pub shoulder_width: Option<f32>,
    pub torso_length: Option<f32>,
    pub arm_length: Option<f32>,
    pub leg_length: Option<f32>,
    pub hip_width: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrientationKind {
    Front,
    ThreeQuarter,
    Side,
    Unknown,
}

impl OrientationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OrientationKind::Front => "front",
            OrientationKind::ThreeQuarter => "three-quarter",
            OrientationKind::Side => "side",
            OrientationKind::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Orientation {
    pub kind: OrientationKind,
    pub confidence: f32,
    /// Shoulder line angle in degrees.
    pub body_angle: f32,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            kind: OrientationKind::Unknown,
            confidence: 0.0,
            body_angle: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PoseClass {
    ArmsRaised,
    OneArmRaised,
    ArmsDown,
    #[default]
    Standing,
}

impl PoseClass {
    pub fn label(&self) -> &'static str {
        match self {
            PoseClass::ArmsRaised => "arms-raised",
            PoseClass::OneArmRaised => "one-arm-raised",
            PoseClass::ArmsDown => "arms-down",
            PoseClass::Standing => "standing",
        }
    }
}

fn pair_distance(pose: &PoseFrame, a: KeypointName, b: KeypointName) -> Option<f32> {
    Some(distance(pose.position(a)?, pose.position(b)?))
}

fn chain_length(pose: &PoseFrame, chain: [KeypointName; 3]) -> Option<f32> {
    Some(pair_distance(pose, chain[0], chain[1])? + pair_distance(pose, chain[1], chain[2])?)
}

pub fn measure(pose: &PoseFrame) -> BodyMeasurements {
    use KeypointName::*;

    BodyMeasurements {
        shoulder_width: pair_distance(pose, LeftShoulder, RightShoulder),
        torso_length: pair_distance(pose, LeftShoulder, LeftHip),
        arm_length: chain_length(pose, [LeftShoulder, LeftElbow, LeftWrist])
            .or_else(|| chain_length(pose, [RightShoulder, RightElbow, RightWrist])),
        leg_length: chain_length(pose, [LeftHip, LeftKnee, LeftAnkle])
            .or_else(|| chain_length(pose, [RightHip, RightKnee, RightAnkle])),
        hip_width: pair_distance(pose, LeftHip, RightHip),
    }
}

/// Signed angle of the left-to-right shoulder line, in degrees.
pub fn body_angle(pose: &PoseFrame) -> f32 {
    match (
        pose.position(KeypointName::LeftShoulder),
        pose.position(KeypointName::RightShoulder),
    ) {
        (Some(left), Some(right)) => (right.1 - left.1).atan2(right.0 - left.0).to_degrees(),
        _ => 0.0,
    }
}

pub fn orientation(pose: &PoseFrame) -> Orientation {
    let (Some(nose), Some(left), Some(right)) = (
        pose.position(KeypointName::Nose),
        pose.position(KeypointName::LeftShoulder),
        pose.position(KeypointName::RightShoulder),
    ) else {
        return Orientation::default();
    };

    let shoulder_width = distance(left, right);
    let shoulder_center_x = (left.0 + right.0) / 2.0;
    let nose_offset = (nose.0 - shoulder_center_x).abs();

    let (kind, confidence) = if nose_offset < FRONT_OFFSET_RATIO * shoulder_width {
        (OrientationKind::Front, 0.9)
    } else if nose_offset < THREE_QUARTER_OFFSET_RATIO * shoulder_width {
        (OrientationKind::ThreeQuarter, 0.7)
    } else {
        (OrientationKind::Side, 0.6)
    };

    Orientation {
        kind,
        confidence,
        body_angle: body_angle(pose),
    }
}

fn elbow_raised(pose: &PoseFrame, shoulder: KeypointName, elbow: KeypointName) -> Option<bool> {
    // Image y grows downwards.
    Some(pose.position(elbow)?.1 < pose.position(shoulder)?.1)
}

pub fn classify_pose(pose: &PoseFrame) -> PoseClass {
    let sides = [
        elbow_raised(pose, KeypointName::LeftShoulder, KeypointName::LeftElbow),
        elbow_raised(pose, KeypointName::RightShoulder, KeypointName::RightElbow),
    ];

    let evaluated = sides.iter().flatten().count();
    let raised = sides.iter().flatten().filter(|raised| **raised).count();

    match (raised, evaluated) {
        (2, _) => PoseClass::ArmsRaised,
        (1, _) => PoseClass::OneArmRaised,
        (_, 0) => PoseClass::Standing,
        _ => PoseClass::ArmsDown,
    }
}
