use crate::{
    keypoints::SKELETON,
    types::{EnhancedKeypoint, GarmentCategory, GarmentTransform, OverlayUpdate, TrackingState},
};

pub const BOX_LINE_THICKNESS: i32 = 5;
const SKELETON_LINE_THICKNESS: i32 = 3;
const KEYPOINT_RADIUS: i32 = 4;
const BACKGROUND: [u8; 4] = [24, 24, 27, 255];
const SKELETON_COLOR: [u8; 4] = [161, 161, 170, 255];
const KEYPOINT_COLOR: [u8; 4] = [248, 113, 113, 255];

fn garment_color(category: GarmentCategory) -> [u8; 4] {
    match category {
        GarmentCategory::Top => [56, 189, 248, 255],
        GarmentCategory::Bottom => [16, 185, 129, 255],
        GarmentCategory::Shoes => [244, 114, 182, 255],
    }
}

fn state_color(state: TrackingState) -> [u8; 4] {
    match state {
        TrackingState::Tracking => [34, 197, 94, 255],
        TrackingState::PoseLow => [234, 179, 8, 255],
        TrackingState::PoseError => [239, 68, 68, 255],
        TrackingState::Idle | TrackingState::Initializing => [113, 113, 122, 255],
    }
}

/// Reference compositor that rasterises each update into an RGBA buffer.
#[derive(Clone, Debug)]
pub struct OverlayCanvas {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub last_state: TrackingState,
}

impl OverlayCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut canvas = Self {
            rgba: vec![0; (width as usize) * (height as usize) * 4],
            width,
            height,
            last_state: TrackingState::Idle,
        };
        canvas.clear();
        canvas
    }

    pub fn clear(&mut self) {
        for px in self.rgba.chunks_exact_mut(4) {
            px.copy_from_slice(&BACKGROUND);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) as usize) * 4;
        self.rgba
            .get(idx..idx + 4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    pub fn render(&mut self, update: &OverlayUpdate) {
        if update.frame_size.width != self.width || update.frame_size.height != self.height {
            *self = Self::new(update.frame_size.width, update.frame_size.height);
        }
        self.clear();
        self.draw_skeleton(&update.keypoints);
        for transform in update.transforms.iter() {
            self.draw_garment(transform);
        }
        self.draw_keypoints(&update.keypoints);
        self.draw_status(update.state);
        self.last_state = update.state;
    }

    fn draw_skeleton(&mut self, keypoints: &[EnhancedKeypoint]) {
        let find = |name| keypoints.iter().find(|kp| kp.name == name && kp.visible);
        for &(a, b) in SKELETON {
            if let (Some(pa), Some(pb)) = (find(a), find(b)) {
                self.stroke(pa.position(), pb.position(), SKELETON_COLOR, SKELETON_LINE_THICKNESS);
            }
        }
    }

    fn draw_keypoints(&mut self, keypoints: &[EnhancedKeypoint]) {
        for kp in keypoints.iter().filter(|kp| kp.visible) {
            self.fill_disc(kp.position(), KEYPOINT_RADIUS, KEYPOINT_COLOR);
        }
    }

    fn draw_garment(&mut self, transform: &GarmentTransform) {
        let corners = garment_corners(transform);
        let color = garment_color(transform.category);
        for (i, &from) in corners.iter().enumerate() {
            let to = corners[(i + 1) % corners.len()];
            self.stroke(from, to, color, BOX_LINE_THICKNESS);
        }
    }

    fn draw_status(&mut self, state: TrackingState) {
        self.fill_disc((12.0, 12.0), 6, state_color(state));
    }

    /// Walks the segment in unit steps along its longer axis and stamps a
    /// round brush at each step.
    fn stroke(&mut self, from: (f32, f32), to: (f32, f32), color: [u8; 4], thickness: i32) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
        let radius = (thickness.max(1) - 1) / 2;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.fill_disc((from.0 + dx * t, from.1 + dy * t), radius, color);
        }
    }

    fn fill_disc(&mut self, center: (f32, f32), radius: i32, color: [u8; 4]) {
        let (cx, cy) = (center.0.round() as i64, center.1.round() as i64);
        let r = i64::from(radius.max(0));
        for y in (cy - r)..=(cy + r) {
            for x in (cx - r)..=(cx + r) {
                let (ox, oy) = (x - cx, y - cy);
                if ox * ox + oy * oy <= r * r {
                    self.set(x, y, color);
                }
            }
        }
    }

    /// Writes one pixel, ignoring coordinates off the canvas.
    fn set(&mut self, x: i64, y: i64, color: [u8; 4]) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(px) = self.rgba.get_mut(idx..idx + 4) {
            px.copy_from_slice(&color);
        }
    }

    #[cfg(feature = "png-export")]
    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        use anyhow::{Context, anyhow};

        let path = path.as_ref();
        let image = image::RgbaImage::from_raw(self.width, self.height, self.rgba.clone())
            .ok_or_else(|| {
                anyhow!("canvas buffer does not match {}x{}", self.width, self.height)
            })?;
        image
            .save(path)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Box corners rotated about the box centre, clockwise from top-left.
pub fn garment_corners(transform: &GarmentTransform) -> [(f32, f32); 4] {
    let (cx, cy) = transform.center();
    let (hw, hh) = (transform.width / 2.0, transform.height / 2.0);
    let (sin, cos) = transform.rotation.sin_cos();
    [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].map(|(dx, dy)| {
        (cx + dx * cos - dy * sin, cy + dx * sin + dy * cos)
    })
}
