//! Orchestration seam toward the external graph-layout engine.
//!
//! The engine itself lives elsewhere; this module owns the contract:
//! what it is given, what it returns, how a pass is canceled, and the
//! rule that exactly one pass may be in flight at a time. A background
//! pass runs on a worker thread and its single outcome is received on
//! the submitting (display) thread through the handle.

use crate::model::{EdgeGeometry, EdgeId, NodeId, Point};
use crossbeam_channel::{bounded, Receiver};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, warn};

/// Cooperative cancellation flag shared with the engine, which is
/// expected to poll it periodically.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: NodeId,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub id: EdgeId,
    pub a: NodeId,
    pub b: NodeId,
}

/// What the engine is given: node sizes and edge endpoints.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LayoutInput {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
}

/// What the engine hands back: placements and routed edge geometry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LayoutOutput {
    pub node_centers: Vec<(NodeId, Point)>,
    pub edge_geometry: Vec<(EdgeId, EdgeGeometry)>,
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout canceled")]
    Canceled,
    #[error("layout engine failed: {0}")]
    Engine(String),
}

/// Single result of a layout pass. Canceled and failed passes leave the
/// scene untouched; the host decides whether to clear the canvas.
#[derive(Debug)]
pub enum LayoutOutcome {
    Completed(LayoutOutput),
    Canceled,
    Failed(LayoutError),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("a layout pass is already in flight")]
pub struct LayoutBusy;

pub trait LayoutEngine {
    fn layout(&self, input: &LayoutInput, cancel: &CancelToken) -> Result<LayoutOutput, LayoutError>;
}

/// Receiving end of a submitted pass.
pub struct LayoutHandle {
    rx: Receiver<LayoutOutcome>,
    cancel: CancelToken,
    join: Option<JoinHandle<()>>,
}

impl LayoutHandle {
    /// Request cooperative cancellation; the pass still completes with
    /// `LayoutOutcome::Canceled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking poll, for hosts that pump an event loop.
    pub fn try_outcome(&mut self) -> Option<LayoutOutcome> {
        self.rx.try_recv().ok()
    }

    /// Block until the pass finishes.
    pub fn wait(mut self) -> LayoutOutcome {
        let outcome = match self.rx.recv() {
            Ok(o) => o,
            // the worker died without reporting; treat like any other
            // engine failure rather than propagating the panic
            Err(_) => LayoutOutcome::Failed(LayoutError::Engine("layout worker died".into())),
        };
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        outcome
    }
}

/// Clears the in-flight flag even if the worker panics.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Submission gate for layout passes.
pub struct LayoutDriver {
    run_async: bool,
    in_flight: Arc<AtomicBool>,
}

impl LayoutDriver {
    pub fn new(run_async: bool) -> LayoutDriver {
        LayoutDriver { run_async, in_flight: Arc::new(AtomicBool::new(false)) }
    }

    pub fn under_layout(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start a pass, or reject it if one is already running. The
    /// exactly-one-in-flight rule is enforced here, at submission, not
    /// by callers checking a flag.
    pub fn submit<E>(&self, engine: E, input: LayoutInput) -> Result<LayoutHandle, LayoutBusy>
    where
        E: LayoutEngine + Send + 'static,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("layout request ignored: a pass is already in flight");
            return Err(LayoutBusy);
        }

        let cancel = CancelToken::new();
        let (tx, rx) = bounded(1);
        let guard = InFlightGuard(Arc::clone(&self.in_flight));
        let worker_cancel = cancel.clone();
        debug!(
            nodes = input.nodes.len(),
            edges = input.edges.len(),
            run_async = self.run_async,
            "layout pass started"
        );
        let work = move || {
            let _guard = guard;
            let result = engine.layout(&input, &worker_cancel);
            let outcome = if worker_cancel.is_canceled() {
                debug!("layout pass canceled");
                LayoutOutcome::Canceled
            } else {
                match result {
                    Ok(output) => LayoutOutcome::Completed(output),
                    Err(LayoutError::Canceled) => LayoutOutcome::Canceled,
                    Err(err) => {
                        warn!(%err, "layout pass failed");
                        LayoutOutcome::Failed(err)
                    }
                }
            };
            let _ = tx.send(outcome);
        };

        let join = if self.run_async {
            Some(thread::spawn(work))
        } else {
            work();
            None
        };

        Ok(LayoutHandle { rx, cancel, join })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FnEngine<F>(F);

    impl<F> LayoutEngine for FnEngine<F>
    where
        F: Fn(&LayoutInput, &CancelToken) -> Result<LayoutOutput, LayoutError>,
    {
        fn layout(
            &self,
            input: &LayoutInput,
            cancel: &CancelToken,
        ) -> Result<LayoutOutput, LayoutError> {
            (self.0)(input, cancel)
        }
    }

    #[test]
    fn sync_pass_completes_inline() {
        let driver = LayoutDriver::new(false);
        let handle = driver
            .submit(
                FnEngine(|_: &LayoutInput, _: &CancelToken| Ok(LayoutOutput::default())),
                LayoutInput::default(),
            )
            .unwrap();
        assert!(!driver.under_layout());
        assert!(matches!(handle.wait(), LayoutOutcome::Completed(_)));
    }

    #[test]
    fn engine_error_becomes_failed_outcome() {
        let driver = LayoutDriver::new(false);
        let handle = driver
            .submit(
                FnEngine(|_: &LayoutInput, _: &CancelToken| {
                    Err(LayoutError::Engine("no placement".into()))
                }),
                LayoutInput::default(),
            )
            .unwrap();
        assert!(matches!(handle.wait(), LayoutOutcome::Failed(_)));
    }

    #[test]
    fn second_submission_is_rejected_while_in_flight() {
        let driver = LayoutDriver::new(true);
        let (release_tx, release_rx) = bounded::<()>(0);
        let handle = driver
            .submit(
                FnEngine(move |_: &LayoutInput, _: &CancelToken| {
                    let _ = release_rx.recv();
                    Ok(LayoutOutput::default())
                }),
                LayoutInput::default(),
            )
            .unwrap();
        assert!(driver.under_layout());
        let second = driver.submit(
            FnEngine(|_: &LayoutInput, _: &CancelToken| Ok(LayoutOutput::default())),
            LayoutInput::default(),
        );
        assert!(matches!(second, Err(LayoutBusy)));
        release_tx.send(()).unwrap();
        assert!(matches!(handle.wait(), LayoutOutcome::Completed(_)));
        assert!(!driver.under_layout());
    }

    #[test]
    fn cancellation_yields_canceled_outcome() {
        let driver = LayoutDriver::new(true);
        let (started_tx, started_rx) = bounded::<()>(0);
        let handle = driver
            .submit(
                FnEngine(move |_: &LayoutInput, cancel: &CancelToken| {
                    let _ = started_tx.send(());
                    while !cancel.is_canceled() {
                        thread::yield_now();
                    }
                    Err(LayoutError::Canceled)
                }),
                LayoutInput::default(),
            )
            .unwrap();
        started_rx.recv().unwrap();
        handle.cancel();
        assert!(matches!(handle.wait(), LayoutOutcome::Canceled));
        assert!(!driver.under_layout());
    }

    #[test]
    fn cancel_flag_wins_even_on_ok_result() {
        let driver = LayoutDriver::new(false);
        let handle = driver
            .submit(
                FnEngine(|_: &LayoutInput, cancel: &CancelToken| {
                    // engine missed the flag and finished anyway
                    cancel.cancel();
                    Ok(LayoutOutput::default())
                }),
                LayoutInput::default(),
            )
            .unwrap();
        assert!(matches!(handle.wait(), LayoutOutcome::Canceled));
    }
}
