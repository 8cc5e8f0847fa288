use std::{thread, time::Duration};

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};

use crate::{
    error::SessionError,
    types::{FrameContext, RawKeypoint},
};

/// What one estimation call returns, in frame pixels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoseEstimate {
    pub success: bool,
    pub keypoints: Vec<RawKeypoint>,
    pub confidence: f32,
}

impl PoseEstimate {
    pub fn detected(keypoints: Vec<RawKeypoint>, confidence: f32) -> Self {
        Self {
            success: true,
            keypoints,
            confidence,
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

/// The pose-estimation model, seen as a black box that turns frames into keypoints.
pub trait PoseSource: Send + 'static {
    /// Called once before the first estimation.
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn estimate(&mut self, frame: &FrameContext) -> Result<PoseEstimate>;

    fn label(&self) -> &str {
        "pose-source"
    }
}

impl<S: PoseSource + ?Sized> PoseSource for Box<S> {
    fn initialize(&mut self) -> Result<()> {
        (**self).initialize()
    }

    fn estimate(&mut self, frame: &FrameContext) -> Result<PoseEstimate> {
        (**self).estimate(frame)
    }

    fn label(&self) -> &str {
        (**self).label()
    }
}

/// Runs a [`PoseSource`] on its own thread and bounds every call with a timeout.
///
/// At most one request is in flight. After a timeout the stalled request keeps
/// the worker busy; further calls fail fast until its late result arrives, which
/// is then discarded.
pub struct EstimatorWorker {
    label: String,
    request_tx: Option<Sender<FrameContext>>,
    response_rx: Receiver<Result<PoseEstimate>>,
    handle: Option<thread::JoinHandle<()>>,
    timeout: Duration,
    in_flight: bool,
}

impl EstimatorWorker {
    /// Takes an already initialized source.
    pub fn spawn<S: PoseSource>(mut source: S, timeout: Duration) -> Result<Self, SessionError> {
        let label = source.label().to_string();
        let (request_tx, request_rx) = bounded::<FrameContext>(1);
        let (response_tx, response_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name("pose-estimator".to_string())
            .spawn(move || {
                while let Ok(frame) = request_rx.recv() {
                    let result = source.estimate(&frame);
                    if response_tx.send(result).is_err() {
                        break;
                    }
                }
            })
            .map_err(|source| SessionError::Spawn {
                name: "pose-estimator",
                source,
            })?;

        Ok(Self {
            label,
            request_tx: Some(request_tx),
            response_rx,
            handle: Some(handle),
            timeout,
            in_flight: false,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    fn collect_stale(&mut self) -> Result<()> {
        match self.response_rx.try_recv() {
            Ok(_late) => {
                log::debug!("discarding late estimate from {}", self.label);
                self.in_flight = false;
                Ok(())
            }
            Err(TryRecvError::Empty) => Err(anyhow!(
                "{} is still busy with a stalled estimation",
                self.label
            )),
            Err(TryRecvError::Disconnected) => {
                self.in_flight = false;
                Err(anyhow!("{} worker exited", self.label))
            }
        }
    }
}

impl PoseSource for EstimatorWorker {
    fn estimate(&mut self, frame: &FrameContext) -> Result<PoseEstimate> {
        if self.in_flight {
            self.collect_stale()?;
        }

        let request_tx = self
            .request_tx
            .as_ref()
            .ok_or_else(|| anyhow!("{} worker is shut down", self.label))?;
        request_tx
            .send(*frame)
            .map_err(|_| anyhow!("{} worker exited", self.label))?;
        self.in_flight = true;

        match self.response_rx.recv_timeout(self.timeout) {
            Ok(result) => {
                self.in_flight = false;
                result
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "{} stalled for more than {:?}, skipping frame",
                    self.label,
                    self.timeout
                );
                Err(anyhow!("estimation exceeded {:?}", self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.in_flight = false;
                Err(anyhow!("{} worker exited", self.label))
            }
        }
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for EstimatorWorker {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.request_tx.take();
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.in_flight && !handle.is_finished() {
            log::warn!(
                "{} still running a stalled estimation, detaching worker",
                self.label
            );
            return;
        }
        let _ = handle.join();
    }
}
