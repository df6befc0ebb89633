use super::Runtime;
use super::handle::Handle;
use super::queue::{JobQueue, MicrotaskQueue};
use crate::deferred::tracker::{RejectionTracker, UnhandledRejections};

use std::rc::Rc;

/// Builder for configuring and creating a runtime.
///
/// # Examples
///
/// ```rust
/// let runtime = deferred::Runtime::builder()
///     .job_limit(10_000)
///     .build();
/// ```
pub struct RuntimeBuilder {
    /// Maximum number of jobs run by a single drain, if any.
    job_limit: Option<usize>,

    /// Whether the bundled unhandled-rejection tracker is installed.
    track_unhandled: bool,

    /// Host tracker replacing the bundled one.
    tracker: Option<Rc<dyn RejectionTracker>>,
}

impl RuntimeBuilder {
    /// Creates a builder with the default configuration: no job limit and
    /// the bundled unhandled-rejection tracker enabled.
    pub fn new() -> Self {
        Self {
            job_limit: None,
            track_unhandled: true,
            tracker: None,
        }
    }

    /// Bounds the number of jobs [`Runtime::run_until_idle`] may run.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn job_limit(mut self, n: usize) -> Self {
        assert!(n > 0, "job_limit must be > 0");

        self.job_limit = Some(n);
        self
    }

    /// Enables or disables the bundled unhandled-rejection tracker.
    pub fn track_unhandled(mut self, enabled: bool) -> Self {
        self.track_unhandled = enabled;
        self
    }

    /// Installs a host rejection tracker instead of the bundled one.
    pub fn rejection_tracker(mut self, tracker: Rc<dyn RejectionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Builds the runtime with the configured options.
    pub fn build(self) -> Runtime {
        let queue = Rc::new(MicrotaskQueue::new());
        let handle = Handle::new(queue.clone() as Rc<dyn JobQueue>);

        let mut rejections = None;

        let handle = match self.tracker {
            Some(tracker) => handle.with_tracker(tracker),
            None if self.track_unhandled => {
                let bundled = Rc::new(UnhandledRejections::new());
                rejections = Some(bundled.clone());
                handle.with_tracker(bundled)
            }
            None => handle,
        };

        Runtime::from_parts(queue, handle, rejections, self.job_limit)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
