//! Channel-backed implementation of the background task queue.
//!
//! An unbounded tokio mpsc channel decouples the synchronous write path from
//! a pool of worker tasks. Jobs are executed at-least-once relative to the
//! queue; a job that still fails after the search adapter's bounded retries
//! is logged and dropped, so a crash mid-job can leave the index permanently
//! behind the record store for that one change until a corrective re-index.
//!
//! Workers pull from a shared receiver, so jobs for different documents run
//! in parallel and jobs for the same document may interleave arbitrarily; no
//! per-document serialization is enforced.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::domain::ports::{IndexJob, IndexJobQueue, JobDispatchError, SearchIndex};
use crate::domain::IndexJobRunner;

/// Count of jobs enqueued but not yet executed.
///
/// Tests flush the queue through [`QueueDepth::wait_idle`] before asserting
/// eventual-consistency properties; production code only reads it for
/// shutdown logging.
#[derive(Debug, Default)]
pub struct QueueDepth {
    in_flight: AtomicUsize,
    idle: Notify,
}

impl QueueDepth {
    fn increment(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    fn decrement(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    /// Jobs currently enqueued or executing.
    pub fn current(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Resolve once every enqueued job has been executed.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Receiving half of the queue, consumed by [`IndexWorkerPool::spawn`].
pub struct IndexJobReceiver {
    receiver: UnboundedReceiver<IndexJob>,
    depth: Arc<QueueDepth>,
}

/// Sender half of the queue implementing the [`IndexJobQueue`] port.
///
/// Dropping every clone closes the channel and lets the worker pool drain
/// and exit.
#[derive(Clone)]
pub struct ChannelIndexQueue {
    sender: UnboundedSender<IndexJob>,
    depth: Arc<QueueDepth>,
}

impl ChannelIndexQueue {
    /// Create a connected queue and receiver pair.
    pub fn new() -> (Self, IndexJobReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let depth = Arc::new(QueueDepth::default());
        (
            Self {
                sender,
                depth: depth.clone(),
            },
            IndexJobReceiver { receiver, depth },
        )
    }

    /// Shared depth gauge for flushing and shutdown logging.
    pub fn depth(&self) -> Arc<QueueDepth> {
        self.depth.clone()
    }
}

#[async_trait]
impl IndexJobQueue for ChannelIndexQueue {
    async fn enqueue(&self, job: IndexJob) -> Result<(), JobDispatchError> {
        self.depth.increment();
        self.sender.send(job).map_err(|send_error| {
            self.depth.decrement();
            JobDispatchError::queue_closed(format!(
                "worker pool stopped before {} was accepted",
                send_error.0.label()
            ))
        })
    }
}

/// Pool of tokio tasks executing index jobs.
pub struct IndexWorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl IndexWorkerPool {
    /// Spawn `workers` tasks consuming from `receiver` and executing against
    /// `search_index`.
    ///
    /// At least one worker is always spawned. The pool runs until the last
    /// [`ChannelIndexQueue`] clone is dropped and the channel drains.
    pub fn spawn(
        receiver: IndexJobReceiver,
        search_index: Arc<dyn SearchIndex>,
        workers: usize,
    ) -> Self {
        let IndexJobReceiver { receiver, depth } = receiver;
        let receiver = Arc::new(Mutex::new(receiver));
        let runner = IndexJobRunner::new(search_index);

        let handles = (0..workers.max(1))
            .map(|worker| {
                let receiver = receiver.clone();
                let depth = depth.clone();
                let runner = runner.clone();
                tokio::spawn(async move {
                    loop {
                        let job = { receiver.lock().await.recv().await };
                        let Some(job) = job else { break };

                        if let Err(job_error) = runner.run(&job).await {
                            error!(
                                worker,
                                job = job.label(),
                                error = %job_error,
                                "index job failed after retries; search index will lag the record store"
                            );
                        } else {
                            debug!(worker, job = job.label(), "index job executed");
                        }
                        depth.decrement();
                    }
                    debug!(worker, "index worker stopped: queue closed");
                })
            })
            .collect();

        Self { handles }
    }

    /// Await every worker task after the senders have been dropped.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(join_error) = handle.await {
                error!(error = %join_error, "index worker task panicked");
            }
        }
    }
}
