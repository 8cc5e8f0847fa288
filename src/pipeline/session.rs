use std::time::Duration;

use anyhow::anyhow;

use super::{
    clock::Tick,
    estimator::{PoseEstimate, PoseSource},
};
use crate::{
    config::AlignmentConfig,
    error::{Result, SessionError},
    garment, keypoints,
    metrics::{self, BodyMeasurements, Orientation, PoseClass},
    smoothing::SmoothingFilter,
    types::{
        FrameContext, FrameSize, GarmentCategory, GarmentSet, OverlayUpdate, PoseFrame,
        TrackingState,
    },
};

/// Lifecycle of one tracking session. Only [`AlignmentLoop`] changes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackingSession {
    pub state: TrackingState,
    pub lite_mode: bool,
    pub last_frame_timestamp: Option<Duration>,
}

impl Default for TrackingSession {
    fn default() -> Self {
        Self {
            state: TrackingState::Idle,
            lite_mode: false,
            last_frame_timestamp: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub ticks: u64,
    pub estimations: u64,
    pub failures: u64,
    pub low_confidence: u64,
    pub lite_skipped: u64,
    pub throttled: u64,
}

/// Operator toggles, applied at the start of the next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    SetLiteMode(bool),
    /// The user removed this garment: hide it and forget its smoothing state.
    Clear(GarmentCategory),
    /// Show a garment again; it seeds from its next observation.
    Select(GarmentCategory),
    Resize(FrameSize),
}

/// Single-owner state for the real-time loop: session, smoothing and settings.
pub struct AlignmentLoop {
    config: AlignmentConfig,
    session: TrackingSession,
    filter: SmoothingFilter,
    frame_size: FrameSize,
    target_interval: Duration,
    selected: [bool; 3],
    initialized: bool,
    stats: SessionStats,
}

impl AlignmentLoop {
    pub fn new(config: AlignmentConfig, frame_size: FrameSize) -> Self {
        let session = TrackingSession {
            lite_mode: config.lite_mode,
            ..TrackingSession::default()
        };
        Self {
            filter: SmoothingFilter::from_config(&config),
            target_interval: config.target_frame_interval(),
            config,
            session,
            frame_size,
            selected: [true; 3],
            initialized: false,
            stats: SessionStats::default(),
        }
    }

    pub fn state(&self) -> TrackingState {
        self.session.state
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn config(&self) -> &AlignmentConfig {
        &self.config
    }

    pub fn frame_size(&self) -> FrameSize {
        self.frame_size
    }

    /// Current smoothed overlays without running a new estimation.
    pub fn transforms(&self, now: Duration) -> GarmentSet {
        self.selected_only(self.filter.current(now))
    }

    fn transition(&mut self, next: TrackingState) {
        if self.session.state != next {
            log::debug!(
                "tracking state {} -> {}",
                self.session.state.label(),
                next.label()
            );
            self.session.state = next;
        }
    }

    /// Brings the pose source up. A failure leaves the session in `pose-error`
    /// until the caller initializes again.
    pub fn initialize<S: PoseSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        self.transition(TrackingState::Initializing);
        match source.initialize() {
            Ok(()) => {
                log::info!("pose source {} ready", source.label());
                self.initialized = true;
                Ok(())
            }
            Err(err) => {
                log::error!("failed to initialize pose source {}: {err:#}", source.label());
                self.initialized = false;
                self.transition(TrackingState::PoseError);
                Err(SessionError::AdapterUnavailable(err))
            }
        }
    }

    /// Ends the session. Smoothing state is discarded with it.
    pub fn stop(&mut self) -> SessionStats {
        self.initialized = false;
        self.filter.reset();
        self.session.last_frame_timestamp = None;
        self.transition(TrackingState::Idle);
        self.stats
    }

    pub fn apply_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SetLiteMode(enabled) => {
                if self.session.lite_mode != enabled {
                    log::info!("lite mode {}", if enabled { "on" } else { "off" });
                }
                self.session.lite_mode = enabled;
            }
            SessionCommand::Clear(category) => {
                self.selected[category.index()] = false;
                self.filter.clear(category);
            }
            SessionCommand::Select(category) => {
                self.selected[category.index()] = true;
            }
            SessionCommand::Resize(size) => {
                self.frame_size = size;
            }
        }
    }

    fn selected_only(&self, mut set: GarmentSet) -> GarmentSet {
        for category in GarmentCategory::ALL {
            if !self.selected[category.index()] {
                *set.slot_mut(category) = None;
            }
        }
        set
    }

    /// Runs one scheduling tick. Returns the update for the compositor when this
    /// tick produced an estimation attempt, `None` when it was skipped.
    pub fn on_tick<S: PoseSource + ?Sized>(
        &mut self,
        tick: Tick,
        source: &mut S,
    ) -> Option<OverlayUpdate> {
        self.stats.ticks += 1;

        if !self.initialized {
            return None;
        }
        if self.session.lite_mode {
            self.stats.lite_skipped += 1;
            return None;
        }
        if let Some(last) = self.session.last_frame_timestamp {
            if tick.timestamp.saturating_sub(last) < self.target_interval {
                self.stats.throttled += 1;
                return None;
            }
        }

        self.session.last_frame_timestamp = Some(tick.timestamp);
        self.stats.estimations += 1;

        let frame = FrameContext {
            size: self.frame_size,
            timestamp: tick.timestamp,
        };
        let outcome = match source.estimate(&frame) {
            Ok(estimate) if estimate.success => Ok(estimate),
            Ok(_) => Err(anyhow!("pose source reported an unsuccessful estimate")),
            Err(err) => Err(err),
        };

        Some(match outcome {
            Ok(estimate) => self.process(estimate, tick.timestamp),
            Err(err) => self.fail(err, tick.timestamp),
        })
    }

    fn process(&mut self, estimate: PoseEstimate, now: Duration) -> OverlayUpdate {
        if estimate.confidence < self.config.low_confidence_threshold {
            self.stats.low_confidence += 1;
            self.transition(TrackingState::PoseLow);
        } else {
            self.transition(TrackingState::Tracking);
        }

        let enhanced = keypoints::enhance(&estimate.keypoints, self.config.visibility_threshold);
        let pose = PoseFrame::new(enhanced, estimate.confidence, now);

        let raw = self.selected_only(garment::solve(&pose, self.frame_size));
        let smoothed = self.filter.apply(&raw, now);
        let transforms = self.selected_only(smoothed);

        OverlayUpdate {
            measurements: metrics::measure(&pose),
            orientation: metrics::orientation(&pose),
            pose_class: metrics::classify_pose(&pose),
            keypoints: pose.keypoints,
            transforms,
            state: self.session.state,
            frame_size: self.frame_size,
            timestamp: now,
        }
    }

    fn fail(&mut self, err: anyhow::Error, now: Duration) -> OverlayUpdate {
        self.stats.failures += 1;
        log::warn!("pose estimation failed: {err:#}");
        self.transition(TrackingState::PoseError);

        OverlayUpdate {
            keypoints: Vec::new(),
            transforms: self.transforms(now),
            state: self.session.state,
            measurements: BodyMeasurements::default(),
            orientation: Orientation::default(),
            pose_class: PoseClass::default(),
            frame_size: self.frame_size,
            timestamp: now,
        }
    }
}
