pub mod clock;
pub mod estimator;
pub mod overlay;
pub mod runtime;
pub mod session;
pub mod synthetic;

// Re-exports for convenience
pub use clock::{DisplayClock, FrameClock, ManualClock, Tick};
pub use estimator::{EstimatorWorker, PoseEstimate, PoseSource};
pub use overlay::OverlayCanvas;
pub use runtime::{CancelToken, Compositor, SessionHandle, drive, start_session};
pub use session::{AlignmentLoop, SessionCommand, SessionStats, TrackingSession};
pub use synthetic::SwayingFigure;
