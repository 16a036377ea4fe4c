//! ReplayWorker - background frame processing via message passing
//!
//! A dedicated thread owns the aggregator exclusively; requests arrive on a
//! bounded channel and results leave as immutable frames. No parser state
//! is ever shared across threads, which is the supported replacement for
//! poking a pipeline from another thread.

use std::sync::Arc;
use std::thread::JoinHandle;

use async_channel::{bounded, Receiver, Sender, TrySendError};
use contracts::MergedFrame;
use tracing::{debug, warn};

use crate::aggregator::MultiStreamAggregator;
use crate::Result;

/// Spawns the worker thread.
pub struct ReplayWorker;

/// Handle to a running replay worker.
pub struct WorkerHandle {
    requests: Sender<u64>,
    results: Receiver<Result<MergedFrame>>,
    thread: Option<JoinHandle<()>>,
}

impl ReplayWorker {
    /// Move the aggregator onto a dedicated thread.
    ///
    /// The request channel holds a single slot: a request arriving while
    /// one is being processed is dropped at the channel, mirroring the
    /// aggregator's own gate.
    pub fn spawn(aggregator: MultiStreamAggregator) -> WorkerHandle {
        let aggregator = Arc::new(aggregator);
        let (request_tx, request_rx) = bounded::<u64>(1);
        let (result_tx, result_rx) = bounded::<Result<MergedFrame>>(1);

        let thread = std::thread::spawn(move || {
            debug!("replay worker started");
            while let Ok(target_ns) = request_rx.recv_blocking() {
                let result = aggregator.process_frame(target_ns);
                if result_tx.send_blocking(result).is_err() {
                    break;
                }
            }
            debug!("replay worker stopped");
        });

        WorkerHandle {
            requests: request_tx,
            results: result_rx,
            thread: Some(thread),
        }
    }
}

impl WorkerHandle {
    /// Request a frame without blocking.
    ///
    /// Returns false when the worker is busy (the request is dropped with
    /// a warning, not queued) or gone.
    pub fn request_frame(&self, target_ns: u64) -> bool {
        match self.requests.try_send(target_ns) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(target_ns, "frame request dropped: worker busy");
                metrics::counter!("replay_requests_dropped_total").increment(1);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!(target_ns, "frame request dropped: worker closed");
                false
            }
        }
    }

    /// Block for the next result; `None` when the worker has shut down.
    pub fn next_result(&self) -> Option<Result<MergedFrame>> {
        self.results.recv_blocking().ok()
    }

    /// Close the request channel and join the worker thread.
    pub fn shutdown(mut self) {
        self.requests.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("replay worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.requests.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
