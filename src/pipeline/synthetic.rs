use std::f32::consts::TAU;

use anyhow::{Result, anyhow};

use super::estimator::{PoseEstimate, PoseSource};
use crate::types::{FrameContext, FrameSize, KeypointName, RawKeypoint};

/// Standing pose in unit coordinates: (name, x, y) as fractions of the frame.
const REST_POSE: &[(KeypointName, f32, f32)] = &[
    (KeypointName::Nose, 0.50, 0.14),
    (KeypointName::LeftEye, 0.48, 0.12),
    (KeypointName::RightEye, 0.52, 0.12),
    (KeypointName::LeftEar, 0.46, 0.13),
    (KeypointName::RightEar, 0.54, 0.13),
    (KeypointName::LeftShoulder, 0.42, 0.24),
    (KeypointName::RightShoulder, 0.58, 0.24),
    (KeypointName::LeftElbow, 0.39, 0.38),
    (KeypointName::RightElbow, 0.61, 0.38),
    (KeypointName::LeftWrist, 0.38, 0.50),
    (KeypointName::RightWrist, 0.62, 0.50),
    (KeypointName::LeftHip, 0.44, 0.54),
    (KeypointName::RightHip, 0.56, 0.54),
    (KeypointName::LeftKnee, 0.44, 0.71),
    (KeypointName::RightKnee, 0.56, 0.71),
    (KeypointName::LeftAnkle, 0.44, 0.88),
    (KeypointName::RightAnkle, 0.56, 0.88),
];

/// Deterministic stand-in for a pose model: a figure swaying side to side with
/// per-landmark jitter, occasional leg occlusion and optional injected failures.
#[derive(Clone, Debug)]
pub struct SwayingFigure {
    sway_amplitude: f32,
    sway_period_secs: f32,
    jitter_px: f32,
    occlude_legs_every: Option<u64>,
    fail_every: Option<u64>,
    calls: u64,
}

impl Default for SwayingFigure {
    fn default() -> Self {
        Self {
            sway_amplitude: 0.04,
            sway_period_secs: 3.0,
            jitter_px: 3.0,
            occlude_legs_every: None,
            fail_every: None,
            calls: 0,
        }
    }
}

impl SwayingFigure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jitter(mut self, jitter_px: f32) -> Self {
        self.jitter_px = jitter_px;
        self
    }

    /// Hide knees and ankles on every n-th call.
    pub fn occlude_legs_every(mut self, n: u64) -> Self {
        self.occlude_legs_every = Some(n.max(1));
        self
    }

    /// Fail every n-th call, as a flaky backend would.
    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn keypoints(&self, size: FrameSize, seconds: f32, legs_hidden: bool) -> Vec<RawKeypoint> {
        let (w, h) = (size.width as f32, size.height as f32);
        let sway = (seconds / self.sway_period_secs * TAU).sin() * self.sway_amplitude;

        REST_POSE
            .iter()
            .enumerate()
            .filter(|(_, (name, _, _))| !(legs_hidden && is_leg(*name)))
            .map(|(i, &(name, ux, uy))| {
                // Cheap deterministic noise per landmark and call.
                let phase = (self.calls as f32) * 1.7 + i as f32 * 2.3;
                let jx = phase.sin() * self.jitter_px;
                let jy = (phase * 1.3).cos() * self.jitter_px;
                // Hips sway less than shoulders.
                let lean = if uy < 0.5 { sway } else { sway * 0.5 };
                RawKeypoint::new(name, (ux + lean) * w + jx, uy * h + jy, 0.85)
            })
            .collect()
    }
}

fn is_leg(name: KeypointName) -> bool {
    matches!(
        name,
        KeypointName::LeftKnee
            | KeypointName::RightKnee
            | KeypointName::LeftAnkle
            | KeypointName::RightAnkle
    )
}

impl PoseSource for SwayingFigure {
    fn estimate(&mut self, frame: &FrameContext) -> Result<PoseEstimate> {
        self.calls += 1;
        if self.fail_every.is_some_and(|n| self.calls % n == 0) {
            return Err(anyhow!("synthetic failure on call {}", self.calls));
        }
        let legs_hidden = self.occlude_legs_every.is_some_and(|n| self.calls % n == 0);
        let keypoints = self.keypoints(frame.size, frame.timestamp.as_secs_f32(), legs_hidden);
        Ok(PoseEstimate::detected(keypoints, 0.8))
    }

    fn label(&self) -> &str {
        "swaying-figure"
    }
}
