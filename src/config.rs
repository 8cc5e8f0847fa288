use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::{
    error::{Result, SessionError},
    keypoints::DEFAULT_VISIBILITY_THRESHOLD,
    smoothing::DEFAULT_ALPHA,
};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AlignmentConfig {
    /// Upper bound on estimation calls per second.
    #[serde(default = "default_target_fps")]
    pub target_fps: f32,
    /// EMA weight given to each new raw transform.
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// Keypoints scoring above this are marked visible.
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// Frames with overall confidence below this report `pose-low`.
    #[serde(default = "default_low_confidence_threshold")]
    pub low_confidence_threshold: f32,
    #[serde(default)]
    pub lite_mode: bool,
    /// Longest wait for one estimation before the tick counts as failed.
    #[serde(default = "default_estimate_timeout_ms")]
    pub estimate_timeout_ms: u64,
    /// Hide a frozen overlay after this long without a fresh observation.
    #[serde(default)]
    pub hold_limit_ms: Option<u64>,
}

fn default_target_fps() -> f32 { 30.0 }
fn default_alpha() -> f32 { DEFAULT_ALPHA }
fn default_visibility_threshold() -> f32 { DEFAULT_VISIBILITY_THRESHOLD }
fn default_low_confidence_threshold() -> f32 { 0.2 }
fn default_estimate_timeout_ms() -> u64 { 250 }

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            alpha: default_alpha(),
            visibility_threshold: default_visibility_threshold(),
            low_confidence_threshold: default_low_confidence_threshold(),
            lite_mode: false,
            estimate_timeout_ms: default_estimate_timeout_ms(),
            hold_limit_ms: None,
        }
    }
}

impl AlignmentConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| SessionError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AlignmentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "target_fps must be positive, got {}",
                self.target_fps
            )));
        }
        if Duration::try_from_secs_f64(1.0 / f64::from(self.target_fps)).is_err() {
            return Err(SessionError::InvalidConfig(format!(
                "target_fps {} gives a frame interval too long to represent",
                self.target_fps
            )));
        }
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(SessionError::InvalidConfig(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        for (name, value) in [
            ("visibility_threshold", self.visibility_threshold),
            ("low_confidence_threshold", self.low_confidence_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SessionError::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if self.estimate_timeout_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "estimate_timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Minimum spacing between two estimation calls (1000 / 30 ms by default).
    /// Saturates for rates `validate` rejects.
    pub fn target_frame_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / f64::from(self.target_fps)).unwrap_or(Duration::MAX)
    }

    pub fn estimate_timeout(&self) -> Duration {
        Duration::from_millis(self.estimate_timeout_ms)
    }

    pub fn hold_limit(&self) -> Option<Duration> {
        self.hold_limit_ms.map(Duration::from_millis)
    }
}
