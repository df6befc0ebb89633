use super::builder::RuntimeBuilder;
use super::handle::Handle;
use super::queue::MicrotaskQueue;
use crate::deferred::DeferredId;
use crate::deferred::tracker::UnhandledRejections;
use crate::error::DeferredError;

use std::rc::Rc;

use tracing::{debug, warn};

/// The main runtime.
///
/// `Runtime` is responsible for:
/// - owning the FIFO job queue deferreds schedule their work on,
/// - handing out the [`Handle`] used to create deferreds,
/// - draining the queue, one job at a time or until idle,
/// - collecting rejections that never received a handler.
///
/// Everything runs on the calling thread. Nothing happens between two calls
/// into the runtime: reactions only run while the queue is being drained.
pub struct Runtime {
    /// Job queue shared with every deferred created from `handle`.
    queue: Rc<MicrotaskQueue>,

    /// Handle given to deferreds.
    handle: Handle,

    /// Bundled unhandled-rejection tracker, when enabled.
    rejections: Option<Rc<UnhandledRejections>>,

    /// Upper bound on jobs run by a single [`run_until_idle`](Self::run_until_idle).
    job_limit: Option<usize>,
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    pub fn new() -> Self {
        RuntimeBuilder::new().build()
    }

    /// Returns a builder for a customized runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub(crate) fn from_parts(
        queue: Rc<MicrotaskQueue>,
        handle: Handle,
        rejections: Option<Rc<UnhandledRejections>>,
        job_limit: Option<usize>,
    ) -> Self {
        Self {
            queue,
            handle,
            rejections,
            job_limit,
        }
    }

    /// Returns the handle deferreds are created with.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Runs the oldest queued job.
    ///
    /// Returns `false` if the queue was empty.
    pub fn turn(&self) -> bool {
        match self.queue.pop() {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs queued jobs in FIFO order until the queue is empty.
    ///
    /// Jobs enqueued while draining are run as well. Returns the number of
    /// jobs that ran.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::JobLimitExceeded`] if a job limit was
    /// configured and the queue is still not idle after that many jobs. The
    /// remaining jobs stay queued.
    pub fn run_until_idle(&self) -> Result<usize, DeferredError> {
        let mut ran = 0;

        loop {
            if let Some(limit) = self.job_limit {
                if ran >= limit && !self.queue.is_empty() {
                    warn!(limit, pending = self.queue.len(), "job queue did not go idle");
                    return Err(DeferredError::JobLimitExceeded(limit));
                }
            }

            if !self.turn() {
                break;
            }

            ran += 1;
        }

        if let Some(rejections) = &self.rejections {
            if !rejections.is_empty() {
                debug!(
                    count = rejections.len(),
                    "queue idle with unhandled rejections"
                );
            }
        }

        Ok(ran)
    }

    /// Returns the number of jobs waiting to run.
    pub fn pending_jobs(&self) -> usize {
        self.queue.len()
    }

    /// Returns and clears the ids of rejected deferreds that still have no
    /// handler.
    ///
    /// Always empty when the bundled tracker was disabled or replaced.
    pub fn take_unhandled_rejections(&self) -> Vec<DeferredId> {
        self.rejections
            .as_ref()
            .map(|rejections| rejections.take())
            .unwrap_or_default()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
