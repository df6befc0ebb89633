use super::tracker::Observe;
use super::{Deferred, Reason, Resolution, Value};
use crate::runtime::Handle;

use std::rc::Rc;

use tracing::trace;

/// A reaction handler.
///
/// Receives the settled value (or reason) and produces what the downstream
/// deferred is resolved with. Returning `Err` is how a handler throws: the
/// downstream deferred is rejected with the error.
pub(crate) type Handler<V, U, E> = Box<dyn FnOnce(V) -> Result<Resolution<U, E>, E>>;

/// What the reject slot of a reaction does with a reason.
///
/// Used only by the observability walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandlerKind {
    /// A handler supplied by user code. Reaching it means the rejection is
    /// observed.
    User,

    /// An internal handler that only passes the reason on to the
    /// downstream deferred: the rethrow default, combinator plumbing, and
    /// native adoption.
    Forwarding,
}

/// A pending continuation attached to a deferred.
///
/// Both slots are already bound to their downstream; exactly one of them
/// runs, as a job, once the deferred settles. The slots only hold weak
/// references to the downstream deferred; `downstream` is its single owner.
pub(crate) struct Reaction<T, E> {
    on_fulfill: Box<dyn FnOnce(T)>,
    on_reject: Box<dyn FnOnce(E)>,
    pub(crate) reject_kind: HandlerKind,

    /// The deferred settled by this reaction, if any.
    pub(crate) downstream: Option<Rc<dyn Observe>>,
}

impl<T: Value, E: Reason> Reaction<T, E> {
    /// Creates a reaction feeding the outcome of the handlers into
    /// `downstream`.
    pub(crate) fn new<U: Value>(
        on_fulfill: Handler<T, U, E>,
        on_reject: Handler<E, U, E>,
        reject_kind: HandlerKind,
        downstream: &Deferred<U, E>,
    ) -> Self {
        let fulfilled = Rc::downgrade(&downstream.inner);
        let rejected = fulfilled.clone();

        Self {
            on_fulfill: Box::new(move |value| {
                if let Some(downstream) = Deferred::from_weak(&fulfilled) {
                    run_reaction_job(value, on_fulfill, &downstream);
                }
            }),
            on_reject: Box::new(move |reason| {
                if let Some(downstream) = Deferred::from_weak(&rejected) {
                    run_reaction_job(reason, on_reject, &downstream);
                }
            }),
            reject_kind,
            downstream: Some(downstream.inner.clone() as Rc<dyn Observe>),
        }
    }

    /// Creates a reaction whose slots are plain callbacks.
    ///
    /// Used when settlement is forwarded somewhere other than a fresh
    /// downstream deferred, such as native adoption.
    pub(crate) fn forward(
        on_fulfill: impl FnOnce(T) + 'static,
        on_reject: impl FnOnce(E) + 'static,
        reject_kind: HandlerKind,
        downstream: Option<Rc<dyn Observe>>,
    ) -> Self {
        Self {
            on_fulfill: Box::new(on_fulfill),
            on_reject: Box::new(on_reject),
            reject_kind,
            downstream,
        }
    }

    /// Enqueues the slot matching `settled` as a job.
    ///
    /// The reaction never runs synchronously, even when the deferred was
    /// already settled at attachment time. The job keeps the downstream
    /// deferred alive until it has run.
    pub(crate) fn schedule(self, handle: &Handle, settled: Result<T, E>) {
        let Reaction {
            on_fulfill,
            on_reject,
            downstream,
            ..
        } = self;

        if let Some(downstream) = &downstream {
            trace!(downstream = %downstream.id(), "scheduling reaction");
        }

        match settled {
            Ok(value) => handle.enqueue(Box::new(move || {
                let _downstream = downstream;
                on_fulfill(value);
            })),
            Err(reason) => handle.enqueue(Box::new(move || {
                let _downstream = downstream;
                on_reject(reason);
            })),
        }
    }
}

/// Runs a handler and feeds its outcome into the downstream deferred.
///
/// A normal return goes through the resolution procedure of `downstream`;
/// an error rejects it. Nothing escapes the job.
pub(crate) fn run_reaction_job<V, U: Value, E: Reason>(
    input: V,
    handler: Handler<V, U, E>,
    downstream: &Deferred<U, E>,
) {
    match handler(input) {
        Ok(resolution) => downstream.resolve_with(resolution),
        Err(reason) => downstream.reject_with(reason),
    }
}

/// The default fulfillment handler: passes the value through.
pub(crate) fn identity<T: Value, E: Reason>() -> Handler<T, T, E> {
    Box::new(|value| Ok(Resolution::Value(value)))
}

/// The default rejection handler: passes the reason through.
pub(crate) fn rethrow<U: Value, E: Reason>() -> Handler<E, U, E> {
    Box::new(|reason| Err(reason))
}
