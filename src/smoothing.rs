use std::{
    f32::consts::{PI, TAU},
    time::Duration,
};

use crate::{
    config::AlignmentConfig,
    types::{GarmentCategory, GarmentSet, GarmentTransform},
};

pub const DEFAULT_ALPHA: f32 = 0.25;

#[derive(Clone, Copy, Debug)]
struct Track {
    smoothed: GarmentTransform,
    last_observed: Duration,
}

/// EMA filter over per-category garment transforms.
///
/// A category is seeded with its first raw transform and blended from then on.
/// When a frame has no raw transform for a category the previous output is
/// held unchanged; only [`SmoothingFilter::clear`] forgets a category.
pub struct SmoothingFilter {
    alpha: f32,
    hold_limit: Option<Duration>,
    tracks: [Option<Track>; 3],
}

fn lerp(prev: f32, raw: f32, alpha: f32) -> f32 {
    prev + (raw - prev) * alpha
}

/// Maps an angle into (-π, π], the range of `atan2`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Rotation moves along the shorter arc so a wrap at ±π does not spin the overlay.
fn lerp_angle(prev: f32, raw: f32, alpha: f32) -> f32 {
    let delta = wrap_angle(raw - prev);
    wrap_angle(prev + delta * alpha)
}

pub fn blend(prev: &GarmentTransform, raw: &GarmentTransform, alpha: f32) -> GarmentTransform {
    GarmentTransform {
        category: raw.category,
        x: lerp(prev.x, raw.x, alpha),
        y: lerp(prev.y, raw.y, alpha),
        width: lerp(prev.width, raw.width, alpha),
        height: lerp(prev.height, raw.height, alpha),
        rotation: lerp_angle(prev.rotation, raw.rotation, alpha),
    }
}

impl SmoothingFilter {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            hold_limit: None,
            tracks: [None; 3],
        }
    }

    pub fn from_config(config: &AlignmentConfig) -> Self {
        Self::new(config.alpha).with_hold_limit(config.hold_limit())
    }

    /// Stop emitting a category once it has gone unobserved for longer than `limit`.
    /// The smoothed value itself is kept and blending resumes from it.
    pub fn with_hold_limit(mut self, limit: Option<Duration>) -> Self {
        self.hold_limit = limit;
        self
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn update(&mut self, raw: GarmentTransform, now: Duration) -> GarmentTransform {
        let alpha = self.alpha;
        let track = &mut self.tracks[raw.category.index()];
        let smoothed = match track {
            Some(prev) => blend(&prev.smoothed, &raw, alpha),
            None => raw,
        };
        *track = Some(Track {
            smoothed,
            last_observed: now,
        });
        smoothed
    }

    /// Feeds one frame of raw transforms and returns the smoothed set.
    pub fn apply(&mut self, raw: &GarmentSet, now: Duration) -> GarmentSet {
        for transform in raw.iter() {
            self.update(*transform, now);
        }
        self.current(now)
    }

    /// Last smoothed value per category, honouring the hold limit.
    pub fn current(&self, now: Duration) -> GarmentSet {
        let mut set = GarmentSet::default();
        for category in GarmentCategory::ALL {
            let Some(track) = &self.tracks[category.index()] else {
                continue;
            };
            let stale = self
                .hold_limit
                .is_some_and(|limit| now.saturating_sub(track.last_observed) > limit);
            if !stale {
                *set.slot_mut(category) = Some(track.smoothed);
            }
        }
        set
    }

    pub fn is_seeded(&self, category: GarmentCategory) -> bool {
        self.tracks[category.index()].is_some()
    }

    /// Forget a category the user removed; its next observation seeds afresh.
    pub fn clear(&mut self, category: GarmentCategory) {
        if self.tracks[category.index()].take().is_some() {
            log::debug!("cleared smoothing state for {}", category.label());
        }
    }

    pub fn reset(&mut self) {
        self.tracks = [None; 3];
    }
}

impl Default for SmoothingFilter {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
