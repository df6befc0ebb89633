use std::cell::RefCell;
use std::collections::VecDeque;

/// A unit of deferred work.
///
/// Jobs are enqueued by the engine whenever a reaction becomes runnable or a
/// thenable has to be adopted. They never return a value and never fail:
/// every failure is already folded into the state of some deferred.
pub type Job = Box<dyn FnOnce()>;

/// The single interface the engine consumes from its host.
///
/// A job queue must run jobs in the order they were enqueued, and must not
/// run a job from inside [`enqueue`](Self::enqueue). The engine never
/// inspects or reorders the queue.
pub trait JobQueue {
    /// Appends a job to the back of the queue.
    fn enqueue(&self, job: Job);
}

/// The bundled FIFO job queue.
///
/// `MicrotaskQueue` is a plain deque behind a `RefCell`. Jobs are pushed to
/// the back and taken from the front, which gives the strict FIFO order the
/// engine relies on. It is drained by [`Runtime`](crate::Runtime).
pub struct MicrotaskQueue {
    /// Jobs waiting to run, oldest first.
    jobs: RefCell<VecDeque<Job>>,
}

impl MicrotaskQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            jobs: RefCell::new(VecDeque::new()),
        }
    }

    /// Takes the oldest job from the queue.
    ///
    /// The borrow on the queue is released before the job is returned, so
    /// running the job may freely enqueue more work.
    pub fn pop(&self) -> Option<Job> {
        self.jobs.borrow_mut().pop_front()
    }

    /// Returns the number of jobs waiting to run.
    pub fn len(&self) -> usize {
        self.jobs.borrow().len()
    }

    /// Returns `true` if no job is waiting.
    pub fn is_empty(&self) -> bool {
        self.jobs.borrow().is_empty()
    }
}

impl JobQueue for MicrotaskQueue {
    fn enqueue(&self, job: Job) {
        self.jobs.borrow_mut().push_back(job);
    }
}

impl Default for MicrotaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
