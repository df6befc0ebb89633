//! Deferred values.
//!
//! This module implements the deferred-value engine itself:
//! - `core`: the [`Deferred`] handle, settlement and reaction attachment,
//! - `resolve`: the resolution procedure and thenable interop,
//! - `reaction`: reaction records and the job that runs a handler,
//! - `capability`: resolve/reject entry points and the capability factory,
//! - `combinators`: `all` and `race`,
//! - `tracker`: rejection observability and the host rejection hook.
//!
//! Settlement and reaction jobs are scheduled on the job queue reached
//! through the [`Handle`](crate::Handle) a deferred was created with.

pub(crate) mod capability;
pub(crate) mod combinators;
pub(crate) mod core;
pub(crate) mod reaction;
pub(crate) mod resolve;
pub(crate) mod state;
pub(crate) mod tracker;

pub use self::core::Deferred;
pub use capability::{Capability, Executor, Native, RejectFn, ResolveFn, Species};
pub use resolve::{Resolution, ThenProbe, Thenable};
pub use state::{DeferredId, State};
pub use tracker::{RejectionEvent, RejectionTracker, UnhandledRejections};

use crate::error::DeferredError;

/// Bound on fulfillment values.
///
/// Settled results are handed to every reaction, hence `Clone`.
pub trait Value: Clone + 'static {}

impl<T: Clone + 'static> Value for T {}

/// Bound on rejection reasons.
///
/// Engine failures such as a resolution cycle become rejections, so a
/// reason type must be able to absorb a [`DeferredError`].
pub trait Reason: Clone + From<DeferredError> + 'static {}

impl<E: Clone + From<DeferredError> + 'static> Reason for E {}
