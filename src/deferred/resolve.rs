use super::capability::{RejectFn, ResolveFn, resolving_functions};
use super::reaction::{HandlerKind, Reaction};
use super::tracker::Observe;
use super::{Deferred, Reason, Value};
use crate::error::DeferredError;

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

/// A candidate result handed to the resolution procedure.
pub enum Resolution<T, E> {
    /// A plain value. Fulfills immediately.
    Value(T),

    /// A native deferred, adopted through the fast path when already
    /// settled.
    Deferred(Deferred<T, E>),

    /// A foreign future, adopted by calling its `then` from a job.
    Thenable(Rc<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    /// Wraps a thenable.
    pub fn thenable(thenable: impl Thenable<T, E> + 'static) -> Self {
        Resolution::Thenable(Rc::new(thenable))
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolution::Deferred(deferred) => f.debug_tuple("Deferred").field(deferred).finish(),
            Resolution::Thenable(_) => f.write_str("Thenable(..)"),
        }
    }
}

/// Outcome of looking up the `then` member of a thenable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThenProbe<T> {
    /// `then` is callable: adopt the thenable.
    Callable,

    /// `then` is present but not callable: the object is a plain value.
    NotCallable(T),
}

/// Anything exposing a callable `then(resolve, reject)`.
///
/// This is the interop surface for foreign futures. [`Deferred`] implements
/// it too, which lets a native deferred be adopted through the generic,
/// job-based path.
pub trait Thenable<T, E> {
    /// Subscribes the given entry points to the eventual outcome.
    ///
    /// Returning an error counts as `then` throwing: the adopting deferred
    /// is rejected with it, unless one of the entry points already ran.
    fn then(&self, resolve: ResolveFn<T, E>, reject: RejectFn<E>) -> Result<(), E>;

    /// Looks up the `then` member.
    ///
    /// An error rejects the adopting deferred right away. The default
    /// reports a callable `then`.
    fn probe(&self) -> Result<ThenProbe<T>, E> {
        Ok(ThenProbe::Callable)
    }
}

impl<T: Value, E: Reason> Deferred<T, E> {
    /// Drives this deferred toward settlement using `resolution`.
    ///
    /// Plain values fulfill it at once. A settled native deferred has its
    /// result copied over synchronously. Pending native deferreds and
    /// thenables are adopted from a job, so reactions never run inside the
    /// call that produced the value.
    pub(crate) fn resolve_with(&self, resolution: Resolution<T, E>) {
        match resolution {
            Resolution::Value(value) => self.fulfill(value),
            Resolution::Deferred(source) => self.adopt(source),
            Resolution::Thenable(thenable) => match thenable.probe() {
                Err(reason) => self.reject_with(reason),
                Ok(ThenProbe::NotCallable(value)) => self.fulfill(value),
                Ok(ThenProbe::Callable) => {
                    let target = self.clone();
                    trace!(deferred = %self.inner.id, "enqueueing resolve-thenable job");
                    self.inner
                        .handle
                        .enqueue(Box::new(move || resolve_thenable_job(target, thenable)));
                }
            },
        }
    }

    fn adopt(&self, source: Deferred<T, E>) {
        if source.ptr_eq(self) {
            debug!(deferred = %self.inner.id, "deferred resolved with itself");
            self.reject_with(E::from(DeferredError::CyclicResolution(self.inner.id)));
            return;
        }

        match source.result() {
            Some(Ok(value)) => self.fulfill(value),
            Some(Err(reason)) => {
                source.mark_handled();
                self.reject_with(reason);
            }
            None => {
                source.set_handled_by(self);

                let source_job = source.clone();
                let target = self.clone();
                trace!(deferred = %self.inner.id, source = %source.inner.id, "enqueueing adoption job");
                self.inner
                    .handle
                    .enqueue(Box::new(move || adopt_pending_job(source_job, target)));
            }
        }
    }
}

/// Calls the `then` of a foreign future with fresh entry points of `target`.
fn resolve_thenable_job<T: Value, E: Reason>(target: Deferred<T, E>, thenable: Rc<dyn Thenable<T, E>>) {
    trace!(deferred = %target.inner.id, "running resolve-thenable job");

    let (resolve, reject) = resolving_functions(&target);

    if let Err(reason) = thenable.then(resolve, reject.clone()) {
        reject.reject(reason);
    }
}

/// Subscribes `target` to a native deferred that was pending when the
/// resolution procedure saw it.
///
/// The reaction runs once, so it needs no resolving functions of its own.
fn adopt_pending_job<T: Value, E: Reason>(source: Deferred<T, E>, target: Deferred<T, E>) {
    let fulfilled = Rc::downgrade(&target.inner);
    let rejected = fulfilled.clone();

    source.attach(Reaction::forward(
        move |value| {
            if let Some(target) = Deferred::from_weak(&fulfilled) {
                target.fulfill(value);
            }
        },
        move |reason| {
            if let Some(target) = Deferred::from_weak(&rejected) {
                target.reject_with(reason);
            }
        },
        HandlerKind::Forwarding,
        Some(target.inner as Rc<dyn Observe>),
    ));
}

impl<T: Value, E: Reason> Thenable<T, E> for Deferred<T, E> {
    fn then(&self, resolve: ResolveFn<T, E>, reject: RejectFn<E>) -> Result<(), E> {
        self.attach(Reaction::forward(
            move |value| resolve.fulfill(value),
            move |reason| reject.reject(reason),
            HandlerKind::User,
            None,
        ));

        Ok(())
    }
}
