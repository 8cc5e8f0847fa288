use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crossbeam_channel::{Receiver, Sender, unbounded};

use super::{
    clock::FrameClock,
    estimator::{EstimatorWorker, PoseSource},
    session::{AlignmentLoop, SessionCommand, SessionStats},
};
use crate::{
    config::AlignmentConfig,
    error::{Result, SessionError},
    types::{FrameSize, GarmentCategory, OverlayUpdate},
};

/// Receives every processed tick. Drawing pixels is up to the implementor.
pub trait Compositor: Send {
    fn present(&mut self, update: &OverlayUpdate);
}

impl<F> Compositor for F
where
    F: FnMut(&OverlayUpdate) + Send,
{
    fn present(&mut self, update: &OverlayUpdate) {
        self(update)
    }
}

/// Invalidates the scheduled continuation of a running loop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pulls ticks until the clock runs dry or the token is cancelled.
///
/// The token is checked again after every wait, so a tick delivered after
/// cancellation is dropped instead of running against a stopping session.
pub fn drive<S, K, C>(
    alignment: &mut AlignmentLoop,
    source: &mut S,
    clock: &mut K,
    compositor: &mut C,
    commands: &Receiver<SessionCommand>,
    cancel: &CancelToken,
) where
    S: PoseSource + ?Sized,
    K: FrameClock + ?Sized,
    C: Compositor + ?Sized,
{
    while !cancel.is_cancelled() {
        let Some(tick) = clock.request_next_tick() else {
            log::info!("frame clock finished");
            break;
        };
        if cancel.is_cancelled() {
            break;
        }

        while let Ok(command) = commands.try_recv() {
            alignment.apply_command(command);
        }

        if let Some(update) = alignment.on_tick(tick, source) {
            compositor.present(&update);
        }
    }
}

/// A running session on its own thread.
pub struct SessionHandle {
    cancel: CancelToken,
    commands: Sender<SessionCommand>,
    handle: Option<thread::JoinHandle<SessionStats>>,
}

/// Initializes the pose source and starts the real-time loop.
///
/// Initialization happens on the calling thread so an unavailable adapter is
/// reported here and no thread is left behind.
pub fn start_session<S, K, C>(
    config: AlignmentConfig,
    frame_size: FrameSize,
    mut source: S,
    clock: K,
    compositor: C,
) -> Result<SessionHandle>
where
    S: PoseSource,
    K: FrameClock + 'static,
    C: Compositor + 'static,
{
    config.validate()?;
    log::info!(
        "starting garment alignment: {:.0} fps target, alpha {}, {}x{} frame{}",
        config.target_fps,
        config.alpha,
        frame_size.width,
        frame_size.height,
        if config.lite_mode { ", lite mode" } else { "" }
    );

    let timeout = config.estimate_timeout();
    let mut alignment = AlignmentLoop::new(config, frame_size);
    alignment.initialize(&mut source)?;
    let mut worker = EstimatorWorker::spawn(source, timeout)?;

    let (command_tx, command_rx) = unbounded();
    let cancel = CancelToken::new();
    let loop_cancel = cancel.clone();

    let handle = thread::Builder::new()
        .name("garment-session".to_string())
        .spawn(move || {
            let mut clock = clock;
            let mut compositor = compositor;
            drive(
                &mut alignment,
                &mut worker,
                &mut clock,
                &mut compositor,
                &command_rx,
                &loop_cancel,
            );
            // Resources go only after the loop has observed the stop.
            drop(compositor);
            drop(clock);
            drop(worker);
            let stats = alignment.stop();
            log::info!(
                "session stopped: {} ticks, {} estimations, {} failures, {} throttled, {} lite",
                stats.ticks,
                stats.estimations,
                stats.failures,
                stats.throttled,
                stats.lite_skipped
            );
            stats
        })
        .map_err(|source| SessionError::Spawn {
            name: "garment-session",
            source,
        })?;

    Ok(SessionHandle {
        cancel,
        commands: command_tx,
        handle: Some(handle),
    })
}

impl SessionHandle {
    fn send(&self, command: SessionCommand) {
        if self.commands.send(command).is_err() {
            log::warn!("session already finished, dropping {command:?}");
        }
    }

    pub fn set_lite_mode(&self, enabled: bool) {
        self.send(SessionCommand::SetLiteMode(enabled));
    }

    pub fn clear(&self, category: GarmentCategory) {
        self.send(SessionCommand::Clear(category));
    }

    pub fn select(&self, category: GarmentCategory) {
        self.send(SessionCommand::Select(category));
    }

    pub fn resize(&self, size: FrameSize) {
        self.send(SessionCommand::Resize(size));
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Cancels the loop first, then waits for it to release its resources.
    pub fn stop(mut self) -> SessionStats {
        self.shutdown()
    }

    fn shutdown(&mut self) -> SessionStats {
        self.cancel.cancel();
        let Some(handle) = self.handle.take() else {
            return SessionStats::default();
        };
        match handle.join() {
            Ok(stats) => stats,
            Err(_) => {
                log::error!("session thread panicked");
                SessionStats::default()
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::AtomicUsize,
        time::{Duration, Instant},
    };

    use anyhow::anyhow;
    use crossbeam_channel::bounded;

    use super::*;
    use crate::{
        pipeline::{
            clock::{DisplayClock, ManualClock, Tick},
            estimator::PoseEstimate,
        },
        types::{FrameContext, KeypointName, RawKeypoint, TrackingState},
    };

    struct StaticFigure {
        fail_on: Vec<usize>,
        calls: usize,
    }

    impl StaticFigure {
        fn new() -> Self {
            Self {
                fail_on: Vec::new(),
                calls: 0,
            }
        }
    }

    impl PoseSource for StaticFigure {
        fn estimate(&mut self, _frame: &FrameContext) -> anyhow::Result<PoseEstimate> {
            let call = self.calls;
            self.calls += 1;
            if self.fail_on.contains(&call) {
                return Err(anyhow!("dropped frame"));
            }
            Ok(PoseEstimate::detected(
                vec![
                    RawKeypoint::new(KeypointName::LeftShoulder, 100.0, 100.0, 0.9),
                    RawKeypoint::new(KeypointName::RightShoulder, 200.0, 100.0, 0.9),
                    RawKeypoint::new(KeypointName::LeftHip, 110.0, 300.0, 0.9),
                    RawKeypoint::new(KeypointName::RightHip, 190.0, 300.0, 0.9),
                ],
                0.9,
            ))
        }
    }

    struct Unavailable;

    impl PoseSource for Unavailable {
        fn initialize(&mut self) -> anyhow::Result<()> {
            Err(anyhow!("model file missing"))
        }

        fn estimate(&mut self, _frame: &FrameContext) -> anyhow::Result<PoseEstimate> {
            unreachable!("never initialized")
        }
    }

    #[test]
    fn runs_to_clock_end_and_reports_stats() {
        let (update_tx, update_rx) = unbounded();
        let clock = ManualClock::simulate(120.0, Duration::from_secs(1));
        let mut source = StaticFigure::new();
        source.fail_on = vec![3];

        let session = start_session(
            AlignmentConfig::default(),
            FrameSize::default(),
            source,
            clock,
            move |update: &OverlayUpdate| {
                let _ = update_tx.send(update.state);
            },
        )
        .unwrap();

        // The compositor is dropped when the loop ends, closing the channel.
        let states: Vec<TrackingState> = update_rx.iter().collect();
        let stats = session.stop();

        assert_eq!(stats.ticks, 120);
        assert_eq!(stats.estimations as usize, states.len());
        assert_eq!(stats.failures, 1);
        assert_eq!(states[3], TrackingState::PoseError);
        assert_eq!(states[4], TrackingState::Tracking);
    }

    #[test]
    fn unavailable_adapter_fails_start() {
        let result = start_session(
            AlignmentConfig::default(),
            FrameSize::default(),
            Unavailable,
            ManualClock::default(),
            |_: &OverlayUpdate| {},
        );
        assert!(matches!(result, Err(SessionError::AdapterUnavailable(_))));
    }

    #[test]
    fn invalid_config_fails_start() {
        let config = AlignmentConfig {
            alpha: 2.0,
            ..AlignmentConfig::default()
        };
        let result = start_session(
            config,
            FrameSize::default(),
            StaticFigure::new(),
            ManualClock::default(),
            |_: &OverlayUpdate| {},
        );
        assert!(matches!(result, Err(SessionError::InvalidConfig(_))));
    }

    #[test]
    fn stop_cancels_a_live_clock() {
        let (update_tx, update_rx) = bounded(1);
        let session = start_session(
            AlignmentConfig::default(),
            FrameSize::default(),
            StaticFigure::new(),
            DisplayClock::new(120.0),
            move |update: &OverlayUpdate| {
                let _ = update_tx.try_send(update.transforms);
            },
        )
        .unwrap();

        let first = update_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(first.top.is_some());
        assert!(session.is_running());

        let stats = session.stop();
        assert!(stats.ticks >= 1);
        // The compositor is released once stop returns.
        while update_rx.try_recv().is_ok() {}
        assert!(update_rx.recv().is_err());
    }

    /// Blocks inside `estimate` far longer than any session timeout.
    struct StalledFigure {
        stall: Duration,
    }

    impl PoseSource for StalledFigure {
        fn estimate(&mut self, _frame: &FrameContext) -> anyhow::Result<PoseEstimate> {
            thread::sleep(self.stall);
            Ok(PoseEstimate::failed())
        }
    }

    #[test]
    fn stalled_estimator_does_not_block_stop() {
        let config = AlignmentConfig {
            estimate_timeout_ms: 50,
            ..AlignmentConfig::default()
        };
        let (update_tx, update_rx) = bounded(1);
        let session = start_session(
            config,
            FrameSize::default(),
            StalledFigure {
                stall: Duration::from_secs(5),
            },
            DisplayClock::new(120.0),
            move |update: &OverlayUpdate| {
                let _ = update_tx.try_send(update.state);
            },
        )
        .unwrap();

        let state = update_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(state, TrackingState::PoseError);

        let started = Instant::now();
        let stats = session.stop();
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "stop took {:?}",
            started.elapsed()
        );
        assert!(stats.failures >= 1);
        assert_eq!(stats.failures, stats.estimations);
    }

    #[test]
    fn commands_take_effect_on_next_tick() {
        let mut alignment = AlignmentLoop::new(AlignmentConfig::default(), FrameSize::default());
        let mut source = StaticFigure::new();
        alignment.initialize(&mut source).unwrap();

        let (command_tx, command_rx) = unbounded();
        command_tx.send(SessionCommand::SetLiteMode(true)).unwrap();

        let presented = AtomicUsize::new(0);
        let mut compositor = |_: &OverlayUpdate| {
            presented.fetch_add(1, Ordering::SeqCst);
        };
        let mut clock = ManualClock::fixed_rate(Duration::from_millis(40), 5);
        drive(
            &mut alignment,
            &mut source,
            &mut clock,
            &mut compositor,
            &command_rx,
            &CancelToken::new(),
        );
        assert_eq!(presented.load(Ordering::SeqCst), 0);
        assert_eq!(source.calls, 0);

        command_tx.send(SessionCommand::SetLiteMode(false)).unwrap();
        let mut clock = ManualClock::from_timestamps([Duration::from_millis(400)]);
        drive(
            &mut alignment,
            &mut source,
            &mut clock,
            &mut compositor,
            &command_rx,
            &CancelToken::new(),
        );
        assert_eq!(source.calls, 1);
        assert_eq!(presented.load(Ordering::SeqCst), 1);
    }

    /// Cancels its token while "waiting" for the refresh it is about to deliver.
    struct CancelWhileWaiting {
        token: CancelToken,
    }

    impl FrameClock for CancelWhileWaiting {
        fn request_next_tick(&mut self) -> Option<Tick> {
            self.token.cancel();
            Some(Tick::at(Duration::ZERO))
        }
    }

    #[test]
    fn tick_after_cancel_is_not_processed() {
        let mut alignment = AlignmentLoop::new(AlignmentConfig::default(), FrameSize::default());
        let mut source = StaticFigure::new();
        alignment.initialize(&mut source).unwrap();

        let token = CancelToken::new();
        let mut clock = CancelWhileWaiting {
            token: token.clone(),
        };
        let (_command_tx, command_rx) = unbounded();
        let presented = AtomicUsize::new(0);
        let mut compositor = |_: &OverlayUpdate| {
            presented.fetch_add(1, Ordering::SeqCst);
        };
        drive(
            &mut alignment,
            &mut source,
            &mut clock,
            &mut compositor,
            &command_rx,
            &token,
        );
        assert_eq!(source.calls, 0);
        assert_eq!(presented.load(Ordering::SeqCst), 0);
        assert_eq!(alignment.stats().ticks, 0);
    }
}
