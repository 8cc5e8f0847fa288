pub mod config;
pub mod error;
pub mod garment;
pub mod keypoints;
pub mod metrics;
pub mod pipeline;
pub mod smoothing;
pub mod types;

pub use config::AlignmentConfig;
pub use error::SessionError;
pub use types::{
    FrameSize, GarmentCategory, GarmentSet, GarmentTransform, KeypointName, OverlayUpdate,
    RawKeypoint, TrackingState,
};
