use crate::types::{BodyPart, EnhancedKeypoint, KeypointName, RawKeypoint};

pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.3;

/// Limb connections drawn by the overlay canvas.
pub const SKELETON: &[(KeypointName, KeypointName)] = &[
    (KeypointName::LeftShoulder, KeypointName::RightShoulder),
    (KeypointName::LeftShoulder, KeypointName::LeftElbow),
    (KeypointName::LeftElbow, KeypointName::LeftWrist),
    (KeypointName::RightShoulder, KeypointName::RightElbow),
    (KeypointName::RightElbow, KeypointName::RightWrist),
    (KeypointName::LeftShoulder, KeypointName::LeftHip),
    (KeypointName::RightShoulder, KeypointName::RightHip),
    (KeypointName::LeftHip, KeypointName::RightHip),
    (KeypointName::LeftHip, KeypointName::LeftKnee),
    (KeypointName::LeftKnee, KeypointName::LeftAnkle),
    (KeypointName::RightHip, KeypointName::RightKnee),
    (KeypointName::RightKnee, KeypointName::RightAnkle),
];

pub fn body_part(name: KeypointName) -> BodyPart {
    use KeypointName::*;
    match name {
        Nose | LeftEye | RightEye | LeftEar | RightEar => BodyPart::Other,
        LeftShoulder | RightShoulder | LeftHip | RightHip => BodyPart::Torso,
        LeftElbow | RightElbow | LeftWrist | RightWrist => BodyPart::Upper,
        LeftKnee | RightKnee | LeftAnkle | RightAnkle => BodyPart::Lower,
    }
}

/// How much a landmark matters for anchoring garments.
pub fn garment_relevance(name: KeypointName) -> f32 {
    use KeypointName::*;
    match name {
        LeftShoulder | RightShoulder | LeftHip | RightHip => 1.0,
        LeftAnkle | RightAnkle => 0.9,
        LeftKnee | RightKnee => 0.8,
        LeftElbow | RightElbow => 0.7,
        LeftWrist | RightWrist => 0.5,
        Nose => 0.3,
        LeftEye | RightEye | LeftEar | RightEar => 0.1,
    }
}

pub fn enhance_keypoint(raw: &RawKeypoint, visibility_threshold: f32) -> EnhancedKeypoint {
    EnhancedKeypoint {
        name: raw.name,
        x: raw.x,
        y: raw.y,
        score: raw.score,
        visible: raw.score > visibility_threshold,
        body_part: body_part(raw.name),
        garment_relevance: garment_relevance(raw.name),
    }
}

/// Annotates every raw keypoint, preserving order. Missing landmarks stay missing.
pub fn enhance(raw: &[RawKeypoint], visibility_threshold: f32) -> Vec<EnhancedKeypoint> {
    raw.iter()
        .map(|kp| enhance_keypoint(kp, visibility_threshold))
        .collect()
}

pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

pub fn midpoint(a: (f32, f32), b: (f32, f32)) -> (f32, f32) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_is_strictly_above_threshold() {
        let raw = [
            RawKeypoint::new(KeypointName::Nose, 1.0, 2.0, 0.3),
            RawKeypoint::new(KeypointName::LeftHip, 3.0, 4.0, 0.31),
        ];
        let enhanced = enhance(&raw, DEFAULT_VISIBILITY_THRESHOLD);
        assert!(!enhanced[0].visible);
        assert!(enhanced[1].visible);
    }

    #[test]
    fn keeps_order_and_coordinates() {
        let raw = [
            RawKeypoint::new(KeypointName::RightAnkle, 10.0, 20.0, 0.9),
            RawKeypoint::new(KeypointName::LeftEye, 5.0, 6.0, 0.1),
        ];
        let enhanced = enhance(&raw, 0.3);
        assert_eq!(enhanced.len(), 2);
        assert_eq!(enhanced[0].name, KeypointName::RightAnkle);
        assert_eq!(enhanced[0].position(), (10.0, 20.0));
        assert_eq!(enhanced[0].body_part, BodyPart::Lower);
        assert_eq!(enhanced[1].body_part, BodyPart::Other);
        assert!((enhanced[0].garment_relevance - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn empty_input_is_fine() {
        assert!(enhance(&[], 0.3).is_empty());
    }

    #[test]
    fn label_parsing_accepts_both_spellings() {
        assert_eq!(
            KeypointName::from_label("leftShoulder"),
            Some(KeypointName::LeftShoulder)
        );
        assert_eq!(
            KeypointName::from_label("right_ankle"),
            Some(KeypointName::RightAnkle)
        );
        assert_eq!(KeypointName::from_label("tail"), None);
    }

    #[test]
    fn every_landmark_has_a_relevance_weight() {
        for name in KeypointName::ALL {
            let weight = garment_relevance(name);
            assert!((0.0..=1.0).contains(&weight), "{name:?}");
        }
    }
}
