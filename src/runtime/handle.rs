use crate::deferred::DeferredId;
use crate::deferred::tracker::{RejectionEvent, RejectionTracker};
use crate::runtime::queue::{Job, JobQueue};

use std::cell::Cell;
use std::rc::Rc;

/// Shared handle to the host environment of a set of deferreds.
///
/// Every [`Deferred`](crate::Deferred) keeps a clone of the handle it was
/// created with. Through it the engine reaches:
/// - the host job queue, used to schedule reactions and thenable adoption,
/// - the optional rejection tracker, notified about unhandled rejections,
/// - the id counter used to label deferreds in diagnostics.
///
/// Cloning a `Handle` is cheap; all clones share the same queue, tracker
/// and counter.
#[derive(Clone)]
pub struct Handle {
    /// The host job queue.
    queue: Rc<dyn JobQueue>,

    /// Host hook notified about rejections without a handler.
    tracker: Option<Rc<dyn RejectionTracker>>,

    /// Next id handed out to a new deferred.
    next_id: Rc<Cell<u64>>,
}

impl Handle {
    /// Creates a handle over a host-provided job queue.
    ///
    /// No rejection tracker is installed; see [`with_tracker`](Self::with_tracker).
    pub fn new(queue: Rc<dyn JobQueue>) -> Self {
        Self {
            queue,
            tracker: None,
            next_id: Rc::new(Cell::new(1)),
        }
    }

    /// Installs a rejection tracker on this handle.
    ///
    /// Deferreds created from the returned handle (or its clones) report
    /// [`RejectionEvent`]s to `tracker`.
    pub fn with_tracker(mut self, tracker: Rc<dyn RejectionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub(crate) fn enqueue(&self, job: Job) {
        self.queue.enqueue(job);
    }

    pub(crate) fn next_id(&self) -> DeferredId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        DeferredId(id)
    }

    pub(crate) fn track(&self, id: DeferredId, event: RejectionEvent) {
        if let Some(tracker) = &self.tracker {
            tracker.track(id, event);
        }
    }
}
