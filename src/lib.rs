//! # Deferred
//!
//! **Deferred** is a single-threaded engine for single-assignment future
//! values, built for the **Nebula** ecosystem hosts that already own an event
//! loop and only need a well-behaved continuation layer on top of it.
//!
//! A [`Deferred`] starts pending and settles exactly once, fulfilled with a
//! value or rejected with a reason. Continuations attached to it never run
//! inside the call that attached them: every reaction is a job on the host's
//! FIFO queue. The engine offers:
//!
//! - **Chained reactions** with [`then`](Deferred::then),
//!   [`and_then`](Deferred::and_then) and [`catch`](Deferred::catch)
//! - **A two-phase resolution procedure** that copies settled native results
//!   synchronously and adopts pending ones and foreign [`Thenable`]s from a job
//! - **Capabilities**: a deferred bundled with single-use resolve/reject entry
//!   points, optionally produced by a custom [`Species`]
//! - **Combinators** [`all`](Deferred::all) and [`race`](Deferred::race)
//! - **Rejection diagnostics**: a host [`RejectionTracker`] hook and the
//!   [`is_observed`](Deferred::is_observed) walk
//!
//! ## Quick Start
//!
//! ```rust
//! use deferred::{Deferred, Resolution, Runtime, State};
//!
//! let rt = Runtime::new();
//!
//! let answer = Deferred::<i32, String>::resolve(rt.handle(), Resolution::Value(21))
//!     .and_then(|v| Ok(Resolution::Value(v * 2)));
//!
//! // Reactions only run while the queue is drained.
//! assert_eq!(answer.state(), State::Pending);
//!
//! rt.run_until_idle().unwrap();
//! assert_eq!(answer.result(), Some(Ok(42)));
//! ```
//!
//! ## Modules
//!
//! - [`deferred`]: The deferred value, resolution, capabilities, combinators
//! - [`runtime`]: Job queue, host handle and the bundled runtime
//! - [`error`]: Engine errors

pub mod deferred;
pub mod error;
pub mod runtime;

pub use deferred::{
    Capability, Deferred, DeferredId, Executor, Native, Reason, RejectFn, RejectionEvent,
    RejectionTracker, Resolution, ResolveFn, Species, State, ThenProbe, Thenable,
    UnhandledRejections, Value,
};
pub use error::DeferredError;
pub use runtime::{Handle, Job, JobQueue, MicrotaskQueue, Runtime, RuntimeBuilder};

pub use deferred_macros::test;
