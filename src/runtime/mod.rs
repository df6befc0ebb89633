//! Host integration.
//!
//! This module contains the pieces connecting deferreds to the host
//! environment that drives them:
//! - `queue`: the job queue interface and the bundled FIFO queue,
//! - `handle`: the handle every deferred keeps to reach its host,
//! - the [`Runtime`] that owns a queue and drains it, and its builder.
//!
//! Hosts that already own a job queue can skip [`Runtime`] entirely and
//! create a [`Handle`] over their own [`JobQueue`].

mod core;

pub(crate) mod builder;
pub(crate) mod handle;
pub(crate) mod queue;

pub use builder::RuntimeBuilder;
pub use self::core::Runtime;
pub use handle::Handle;
pub use queue::{Job, JobQueue, MicrotaskQueue};
