use std::time::Duration;

use crate::metrics::{BodyMeasurements, Orientation, PoseClass};

/// The 17 COCO body landmarks reported by the pose source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeypointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointName {
    pub const ALL: [KeypointName; 17] = [
        KeypointName::Nose,
        KeypointName::LeftEye,
        KeypointName::RightEye,
        KeypointName::LeftEar,
        KeypointName::RightEar,
        KeypointName::LeftShoulder,
        KeypointName::RightShoulder,
        KeypointName::LeftElbow,
        KeypointName::RightElbow,
        KeypointName::LeftWrist,
        KeypointName::RightWrist,
        KeypointName::LeftHip,
        KeypointName::RightHip,
        KeypointName::LeftKnee,
        KeypointName::RightKnee,
        KeypointName::LeftAnkle,
        KeypointName::RightAnkle,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            KeypointName::Nose => "nose",
            KeypointName::LeftEye => "leftEye",
            KeypointName::RightEye => "rightEye",
            KeypointName::LeftEar => "leftEar",
            KeypointName::RightEar => "rightEar",
            KeypointName::LeftShoulder => "leftShoulder",
            KeypointName::RightShoulder => "rightShoulder",
            KeypointName::LeftElbow => "leftElbow",
            KeypointName::RightElbow => "rightElbow",
            KeypointName::LeftWrist => "leftWrist",
            KeypointName::RightWrist => "rightWrist",
            KeypointName::LeftHip => "leftHip",
            KeypointName::RightHip => "rightHip",
            KeypointName::LeftKnee => "leftKnee",
            KeypointName::RightKnee => "rightKnee",
            KeypointName::LeftAnkle => "leftAnkle",
            KeypointName::RightAnkle => "rightAnkle",
        }
    }

    /// Accepts both `leftShoulder` and `left_shoulder` spellings.
    pub fn from_label(label: &str) -> Option<Self> {
        let folded: String = label
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|name| name.label().to_ascii_lowercase() == folded)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyPart {
    Upper,
    Lower,
    Torso,
    Other,
}

/// A landmark as reported by the pose source, in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawKeypoint {
    pub name: KeypointName,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl RawKeypoint {
    pub fn new(name: KeypointName, x: f32, y: f32, score: f32) -> Self {
        Self { name, x, y, score }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnhancedKeypoint {
    pub name: KeypointName,
    pub x: f32,
    pub y: f32,
    pub score: f32,
    pub visible: bool,
    pub body_part: BodyPart,
    pub garment_relevance: f32,
}

impl EnhancedKeypoint {
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// Result of one estimation call after enhancement.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseFrame {
    pub keypoints: Vec<EnhancedKeypoint>,
    pub confidence: f32,
    pub timestamp: Duration,
}

impl PoseFrame {
    pub fn new(keypoints: Vec<EnhancedKeypoint>, confidence: f32, timestamp: Duration) -> Self {
        Self {
            keypoints,
            confidence,
            timestamp,
        }
    }

    /// First keypoint with the given name, if the source reported one.
    pub fn get(&self, name: KeypointName) -> Option<&EnhancedKeypoint> {
        self.keypoints.iter().find(|kp| kp.name == name)
    }

    pub fn position(&self, name: KeypointName) -> Option<(f32, f32)> {
        self.get(name).map(EnhancedKeypoint::position)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// What the loop hands to the pose source for one estimation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    pub size: FrameSize,
    pub timestamp: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GarmentCategory {
    Top,
    Bottom,
    Shoes,
}

impl GarmentCategory {
    pub const ALL: [GarmentCategory; 3] = [
        GarmentCategory::Top,
        GarmentCategory::Bottom,
        GarmentCategory::Shoes,
    ];

    pub fn index(&self) -> usize {
        match self {
            GarmentCategory::Top => 0,
            GarmentCategory::Bottom => 1,
            GarmentCategory::Shoes => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GarmentCategory::Top => "top",
            GarmentCategory::Bottom => "bottom",
            GarmentCategory::Shoes => "shoes",
        }
    }
}

/// Anchored placement of one overlay, in frame pixels. `rotation` is radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GarmentTransform {
    pub category: GarmentCategory,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
}

impl GarmentTransform {
    /// Finite everywhere with a positive extent.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height, self.rotation]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One optional transform per category.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GarmentSet {
    pub top: Option<GarmentTransform>,
    pub bottom: Option<GarmentTransform>,
    pub shoes: Option<GarmentTransform>,
}

impl GarmentSet {
    pub fn get(&self, category: GarmentCategory) -> Option<&GarmentTransform> {
        match category {
            GarmentCategory::Top => self.top.as_ref(),
            GarmentCategory::Bottom => self.bottom.as_ref(),
            GarmentCategory::Shoes => self.shoes.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, category: GarmentCategory) -> &mut Option<GarmentTransform> {
        match category {
            GarmentCategory::Top => &mut self.top,
            GarmentCategory::Bottom => &mut self.bottom,
            GarmentCategory::Shoes => &mut self.shoes,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &GarmentTransform> {
        [self.top.as_ref(), self.bottom.as_ref(), self.shoes.as_ref()]
            .into_iter()
            .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    Initializing,
    Tracking,
    PoseLow,
    PoseError,
}

impl TrackingState {
    pub fn label(&self) -> &'static str {
        match self {
            TrackingState::Idle => "idle",
            TrackingState::Initializing => "initializing",
            TrackingState::Tracking => "tracking",
            TrackingState::PoseLow => "pose-low",
            TrackingState::PoseError => "pose-error",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, TrackingState::Idle)
    }
}

/// Everything the compositor receives for one processed tick.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayUpdate {
    pub keypoints: Vec<EnhancedKeypoint>,
    pub transforms: GarmentSet,
    pub state: TrackingState,
    pub measurements: BodyMeasurements,
    pub orientation: Orientation,
    pub pose_class: PoseClass,
    pub frame_size: FrameSize,
    pub timestamp: Duration,
}
