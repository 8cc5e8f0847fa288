use crate::{
    keypoints::{distance, midpoint},
    types::{FrameSize, GarmentCategory, GarmentSet, GarmentTransform, KeypointName, PoseFrame},
};

const TOP_WIDTH_SCALE: f32 = 1.1;
const TOP_HEIGHT_SCALE: f32 = 1.2;
const TOP_LIFT: f32 = 0.1;

const BOTTOM_WIDTH_SCALE: f32 = 1.05;
const BOTTOM_HEIGHT_SCALE: f32 = 1.1;
const BOTTOM_FALLBACK_WIDTH: f32 = 0.2;

const SHOES_WIDTH_SCALE: f32 = 0.6;
const SHOES_FALLBACK_WIDTH: f32 = 0.15;
const SHOES_LIFT: f32 = 0.02;
const SHOES_HEIGHT: f32 = 0.04;

/// Landmark geometry shared by all categories, gathered once per frame.
struct Skeleton {
    shoulders: Option<((f32, f32), (f32, f32))>,
    hips: Option<((f32, f32), (f32, f32))>,
    knees: Vec<(f32, f32)>,
    ankles: Vec<(f32, f32)>,
}

impl Skeleton {
    fn from_pose(pose: &PoseFrame) -> Self {
        let pair = |a: KeypointName, b: KeypointName| Some((pose.position(a)?, pose.position(b)?));
        let any = |names: [KeypointName; 2]| -> Vec<(f32, f32)> {
            names.iter().filter_map(|name| pose.position(*name)).collect()
        };

        Self {
            shoulders: pair(KeypointName::LeftShoulder, KeypointName::RightShoulder),
            hips: pair(KeypointName::LeftHip, KeypointName::RightHip),
            knees: any([KeypointName::LeftKnee, KeypointName::RightKnee]),
            ankles: any([KeypointName::LeftAnkle, KeypointName::RightAnkle]),
        }
    }

    fn shoulder_width(&self) -> Option<f32> {
        self.shoulders.map(|(l, r)| distance(l, r))
    }

    fn hip_width(&self) -> Option<f32> {
        self.hips.map(|(l, r)| distance(l, r))
    }

    fn hip_mid(&self) -> Option<(f32, f32)> {
        self.hips.map(|(l, r)| midpoint(l, r))
    }
}

fn checked(transform: GarmentTransform) -> Option<GarmentTransform> {
    if transform.is_valid() {
        Some(transform)
    } else {
        log::trace!(
            "dropping degenerate {} transform {transform:?}",
            transform.category.label()
        );
        None
    }
}

fn solve_top(skeleton: &Skeleton) -> Option<GarmentTransform> {
    let (left, right) = skeleton.shoulders?;
    let hip_mid = skeleton.hip_mid()?;

    let shoulder_mid = midpoint(left, right);
    let shoulder_width = distance(left, right);
    let shoulder_top = left.1.min(right.1);

    let height_top = hip_mid.1 - shoulder_top;
    let width_top = shoulder_width * TOP_WIDTH_SCALE;

    checked(GarmentTransform {
        category: GarmentCategory::Top,
        x: shoulder_mid.0 - width_top / 2.0,
        y: shoulder_top - height_top * TOP_LIFT,
        width: width_top,
        height: height_top * TOP_HEIGHT_SCALE,
        rotation: (right.1 - left.1).atan2(right.0 - left.0),
    })
}

fn solve_bottom(skeleton: &Skeleton, frame: FrameSize) -> Option<GarmentTransform> {
    let hip_mid = skeleton.hip_mid()?;
    let lowest_knee = skeleton.knees.iter().map(|k| k.1).reduce(f32::max)?;

    let knee_y = lowest_knee.max(hip_mid.1);
    let leg_height = knee_y - hip_mid.1;
    let base_width = skeleton
        .hip_width()
        .or_else(|| skeleton.shoulder_width())
        .unwrap_or(BOTTOM_FALLBACK_WIDTH * frame.width as f32);
    let width_bottom = base_width * BOTTOM_WIDTH_SCALE;

    checked(GarmentTransform {
        category: GarmentCategory::Bottom,
        x: hip_mid.0 - width_bottom / 2.0,
        y: hip_mid.1,
        width: width_bottom,
        height: leg_height * BOTTOM_HEIGHT_SCALE,
        rotation: 0.0,
    })
}

fn solve_shoes(skeleton: &Skeleton, frame: FrameSize) -> Option<GarmentTransform> {
    let ankle_y = skeleton.ankles.iter().map(|a| a.1).reduce(f32::max)?;
    let ankle_x =
        skeleton.ankles.iter().map(|a| a.0).sum::<f32>() / skeleton.ankles.len() as f32;

    let frame_w = frame.width as f32;
    let frame_h = frame.height as f32;
    let width_shoes =
        skeleton.hip_width().unwrap_or(SHOES_FALLBACK_WIDTH * frame_w) * SHOES_WIDTH_SCALE;

    checked(GarmentTransform {
        category: GarmentCategory::Shoes,
        x: ankle_x - width_shoes / 2.0,
        y: ankle_y - SHOES_LIFT * frame_h,
        width: width_shoes,
        height: SHOES_HEIGHT * frame_h,
        rotation: 0.0,
    })
}

/// Computes every category that has enough landmarks this frame.
pub fn solve(pose: &PoseFrame, frame: FrameSize) -> GarmentSet {
    let skeleton = Skeleton::from_pose(pose);
    GarmentSet {
        top: solve_top(&skeleton),
        bottom: solve_bottom(&skeleton, frame),
        shoes: solve_shoes(&skeleton, frame),
    }
}

pub fn solve_category(
    pose: &PoseFrame,
    frame: FrameSize,
    category: GarmentCategory,
) -> Option<GarmentTransform> {
    let skeleton = Skeleton::from_pose(pose);
    match category {
        GarmentCategory::Top => solve_top(&skeleton),
        GarmentCategory::Bottom => solve_bottom(&skeleton, frame),
        GarmentCategory::Shoes => solve_shoes(&skeleton, frame),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{keypoints::enhance, types::RawKeypoint};

    const FRAME: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    fn pose(points: &[(KeypointName, f32, f32)]) -> PoseFrame {
        let raw: Vec<RawKeypoint> = points
            .iter()
            .map(|&(name, x, y)| RawKeypoint::new(name, x, y, 0.9))
            .collect();
        PoseFrame::new(enhance(&raw, 0.3), 0.9, Duration::ZERO)
    }

    fn torso() -> Vec<(KeypointName, f32, f32)> {
        vec![
            (KeypointName::LeftShoulder, 100.0, 100.0),
            (KeypointName::RightShoulder, 200.0, 100.0),
            (KeypointName::LeftHip, 110.0, 300.0),
            (KeypointName::RightHip, 190.0, 300.0),
        ]
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-4,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn top_regression_fixture() {
        let set = solve(&pose(&torso()), FRAME);
        let top = set.top.expect("top transform");
        assert_eq!(top.category, GarmentCategory::Top);
        assert_close(top.x, 95.0);
        assert_close(top.y, 80.0);
        assert_close(top.width, 110.0);
        assert_close(top.height, 240.0);
        assert_close(top.rotation, 0.0);

        // No knees or ankles in the fixture.
        assert!(set.bottom.is_none());
        assert!(set.shoes.is_none());
    }

    #[test]
    fn top_needs_both_hips() {
        let mut points = torso();
        points.retain(|p| p.0 != KeypointName::RightHip);
        assert!(solve(&pose(&points), FRAME).top.is_none());
    }

    #[test]
    fn top_rotation_tracks_shoulder_tilt() {
        let mut points = torso();
        points[1] = (KeypointName::RightShoulder, 200.0, 200.0);
        let top = solve_category(&pose(&points), FRAME, GarmentCategory::Top).unwrap();
        assert_close(top.rotation, std::f32::consts::FRAC_PI_4);
        // Anchored to the higher shoulder.
        assert_close(top.width, 100.0 * 2.0f32.sqrt() * 1.1);
        assert_close(top.height, 200.0 * 1.2);
    }

    #[test]
    fn bottom_uses_lowest_knee() {
        let mut points = torso();
        points.push((KeypointName::LeftKnee, 110.0, 400.0));
        points.push((KeypointName::RightKnee, 190.0, 420.0));
        let bottom = solve(&pose(&points), FRAME).bottom.unwrap();
        assert_close(bottom.width, 84.0);
        assert_close(bottom.x, 150.0 - 42.0);
        assert_close(bottom.y, 300.0);
        assert_close(bottom.height, 132.0);
        assert_eq!(bottom.rotation, 0.0);
    }

    #[test]
    fn bottom_works_with_a_single_knee() {
        let mut points = torso();
        points.push((KeypointName::RightKnee, 190.0, 400.0));
        let bottom = solve(&pose(&points), FRAME).bottom.unwrap();
        assert_close(bottom.height, 110.0);
    }

    #[test]
    fn bottom_is_dropped_when_knee_is_level_with_hips() {
        let mut points = torso();
        points.push((KeypointName::LeftKnee, 110.0, 250.0));
        assert!(solve(&pose(&points), FRAME).bottom.is_none());
    }

    #[test]
    fn shoes_fall_back_to_frame_width() {
        let points = [(KeypointName::LeftAnkle, 300.0, 450.0)];
        let shoes = solve(&pose(&points), FRAME).shoes.unwrap();
        let width = 0.15 * 640.0 * 0.6;
        assert_close(shoes.width, width);
        assert_close(shoes.x, 300.0 - width / 2.0);
        assert_close(shoes.y, 450.0 - 0.02 * 480.0);
        assert_close(shoes.height, 0.04 * 480.0);
    }

    #[test]
    fn shoes_average_both_ankles() {
        let mut points = torso();
        points.push((KeypointName::LeftAnkle, 120.0, 460.0));
        points.push((KeypointName::RightAnkle, 180.0, 470.0));
        let shoes = solve(&pose(&points), FRAME).shoes.unwrap();
        assert_close(shoes.width, 48.0);
        assert_close(shoes.x, 150.0 - 24.0);
        assert_close(shoes.y, 470.0 - 9.6);
    }

    #[test]
    fn empty_pose_yields_nothing() {
        assert!(solve(&pose(&[]), FRAME).is_empty());
    }

    #[test]
    fn emitted_transforms_are_valid() {
        let mut points = torso();
        points.push((KeypointName::LeftKnee, 110.0, 400.0));
        points.push((KeypointName::LeftAnkle, 110.0, 470.0));
        let set = solve(&pose(&points), FRAME);
        assert_eq!(set.iter().count(), 3);
        assert!(set.iter().all(GarmentTransform::is_valid));
    }
}
