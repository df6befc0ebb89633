use super::capability::{RejectFn, ResolveFn, resolving_functions};
use super::reaction::{self, Handler, HandlerKind, Reaction};
use super::state::{DeferredId, Slot, State};
use super::tracker::{Edge, Observe, RejectionEvent};
use super::{Reason, Resolution, Value};
use crate::runtime::Handle;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

/// A single-assignment deferred value.
///
/// A `Deferred` is a cheap, cloneable handle to a value that may not be
/// available yet. It starts pending and settles exactly once, either
/// fulfilled with a `T` or rejected with an `E`. Continuations are attached
/// with [`then`](Self::then), [`and_then`](Self::and_then) and
/// [`catch`](Self::catch); they always run later, as jobs on the host queue,
/// never inside the call that attached them or settled the deferred.
///
/// All clones refer to the same deferred.
pub struct Deferred<T, E> {
    pub(crate) inner: Rc<Inner<T, E>>,
}

/// Shared state behind a [`Deferred`].
pub(crate) struct Inner<T, E> {
    pub(crate) id: DeferredId,

    /// Pending reactions, or the settled result.
    pub(crate) slot: RefCell<Slot<T, E>>,

    /// Set once any reaction is attached or the deferred is otherwise known
    /// to be observed. Drives the host rejection tracker.
    pub(crate) has_handler: Cell<bool>,

    /// Explicit "handled" hint consulted by the observability walk.
    pub(crate) handled_hint: Cell<bool>,

    /// Outer deferred this one's rejection is forwarded into. Diagnostic
    /// only; never keeps the outer deferred alive.
    pub(crate) handled_by: RefCell<Option<Weak<dyn Observe>>>,

    /// One entry per attached reaction, kept after settlement.
    pub(crate) edges: RefCell<Vec<Edge>>,

    pub(crate) handle: Handle,
}

impl<T: Value, E: Reason> Deferred<T, E> {
    /// Allocates a pending deferred with no resolving functions.
    pub(crate) fn pending(handle: &Handle) -> Self {
        let id = handle.next_id();
        trace!(deferred = %id, "deferred created");

        Self {
            inner: Rc::new(Inner {
                id,
                slot: RefCell::new(Slot::Pending(Vec::new())),
                has_handler: Cell::new(false),
                handled_hint: Cell::new(false),
                handled_by: RefCell::new(None),
                edges: RefCell::new(Vec::new()),
                handle: handle.clone(),
            }),
        }
    }

    pub(crate) fn from_weak(inner: &Weak<Inner<T, E>>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    /// Creates a deferred driven by `executor`.
    ///
    /// The executor runs synchronously and receives the resolve/reject entry
    /// points of the new deferred. Only the first call to either entry point
    /// has an effect. If the executor returns an error, the deferred is
    /// rejected with it, unless it was already resolved.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use deferred::{Deferred, Resolution, Runtime, State};
    ///
    /// let rt = Runtime::new();
    /// let d = Deferred::<i32, String>::new(rt.handle(), |resolve, _reject| {
    ///     resolve.resolve(Resolution::Value(7));
    ///     Ok(())
    /// });
    ///
    /// assert_eq!(d.state(), State::Fulfilled);
    /// ```
    pub fn new<F>(handle: &Handle, executor: F) -> Self
    where
        F: FnOnce(ResolveFn<T, E>, RejectFn<E>) -> Result<(), E>,
    {
        let deferred = Self::pending(handle);
        let (resolve, reject) = resolving_functions(&deferred);

        if let Err(reason) = executor(resolve, reject.clone()) {
            reject.reject(reason);
        }

        deferred
    }

    /// Coerces `resolution` into a deferred.
    ///
    /// A native deferred is returned unchanged. Anything else gets a new
    /// deferred run through the resolution procedure: plain values fulfill
    /// it immediately, thenables are adopted asynchronously.
    pub fn resolve(handle: &Handle, resolution: Resolution<T, E>) -> Self {
        if let Resolution::Deferred(deferred) = resolution {
            return deferred;
        }

        let deferred = Self::pending(handle);
        deferred.resolve_with(resolution);
        deferred
    }

    /// Creates a deferred already rejected with `reason`.
    pub fn reject(handle: &Handle, reason: E) -> Self {
        let deferred = Self::pending(handle);
        deferred.reject_with(reason);
        deferred
    }

    /// Returns the diagnostic id of this deferred.
    pub fn id(&self) -> DeferredId {
        self.inner.id
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.inner.slot.borrow().state()
    }

    /// Returns `true` once the deferred is fulfilled or rejected.
    pub fn is_settled(&self) -> bool {
        self.state() != State::Pending
    }

    /// Returns a copy of the settled result, or `None` while pending.
    pub fn result(&self) -> Option<Result<T, E>> {
        match &*self.inner.slot.borrow() {
            Slot::Pending(_) => None,
            Slot::Fulfilled(value) => Some(Ok(value.clone())),
            Slot::Rejected(reason) => Some(Err(reason.clone())),
        }
    }

    /// Returns `true` if both handles refer to the same deferred.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Attaches a fulfillment and a rejection handler.
    ///
    /// Returns the downstream deferred, resolved with whatever the handler
    /// that runs returns, or rejected with its error.
    pub fn then<U, F, R>(&self, on_fulfill: F, on_reject: R) -> Deferred<U, E>
    where
        U: Value,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
        R: FnOnce(E) -> Result<Resolution<U, E>, E> + 'static,
    {
        self.react(Box::new(on_fulfill), Box::new(on_reject), HandlerKind::User)
    }

    /// Attaches a fulfillment handler only.
    ///
    /// Rejections pass through to the downstream deferred unchanged.
    pub fn and_then<U, F>(&self, on_fulfill: F) -> Deferred<U, E>
    where
        U: Value,
        F: FnOnce(T) -> Result<Resolution<U, E>, E> + 'static,
    {
        self.react(
            Box::new(on_fulfill),
            reaction::rethrow(),
            HandlerKind::Forwarding,
        )
    }

    /// Attaches a rejection handler only.
    ///
    /// Fulfillment values pass through to the downstream deferred unchanged.
    pub fn catch<R>(&self, on_reject: R) -> Deferred<T, E>
    where
        R: FnOnce(E) -> Result<Resolution<T, E>, E> + 'static,
    {
        self.react(reaction::identity(), Box::new(on_reject), HandlerKind::User)
    }

    /// Marks this deferred as handled without attaching a reaction.
    ///
    /// Suppresses the unhandled-rejection report, or revokes it when the
    /// deferred is already rejected.
    pub fn mark_handled(&self) {
        if self.inner.has_handler.replace(true) {
            return;
        }

        if self.state() == State::Rejected {
            self.revoke_rejection();
        }
    }

    /// Returns `true` once a reaction was attached or the deferred was
    /// marked as handled.
    pub fn has_handler(&self) -> bool {
        self.inner.has_handler.get()
    }

    pub(crate) fn react<U: Value>(
        &self,
        on_fulfill: Handler<T, U, E>,
        on_reject: Handler<E, U, E>,
        reject_kind: HandlerKind,
    ) -> Deferred<U, E> {
        let downstream = Deferred::pending(&self.inner.handle);
        self.attach(Reaction::new(on_fulfill, on_reject, reject_kind, &downstream));
        downstream
    }

    /// Stores `reaction`, or schedules it right away when already settled.
    pub(crate) fn attach(&self, reaction: Reaction<T, E>) {
        let first_handler = !self.inner.has_handler.replace(true);
        self.inner.edges.borrow_mut().push(Edge::of(&reaction));

        let settled = {
            let mut slot = self.inner.slot.borrow_mut();
            match &mut *slot {
                Slot::Pending(reactions) => {
                    reactions.push(reaction);
                    return;
                }
                Slot::Fulfilled(value) => Ok(value.clone()),
                Slot::Rejected(reason) => Err(reason.clone()),
            }
        };

        if settled.is_err() && first_handler {
            self.revoke_rejection();
        }

        reaction.schedule(&self.inner.handle, settled);
    }

    /// Fulfills the deferred and schedules its reactions.
    ///
    /// No-op once settled.
    pub(crate) fn fulfill(&self, value: T) {
        let reactions = {
            let mut slot = self.inner.slot.borrow_mut();
            let Slot::Pending(reactions) = &mut *slot else {
                return;
            };
            let reactions = mem::take(reactions);
            *slot = Slot::Fulfilled(value.clone());
            reactions
        };

        trace!(deferred = %self.inner.id, reactions = reactions.len(), "deferred fulfilled");

        for reaction in reactions {
            reaction.schedule(&self.inner.handle, Ok(value.clone()));
        }
    }

    /// Rejects the deferred and schedules its reactions.
    ///
    /// No-op once settled. Reports the rejection to the host tracker when no
    /// handler is attached yet.
    pub(crate) fn reject_with(&self, reason: E) {
        let reactions = {
            let mut slot = self.inner.slot.borrow_mut();
            let Slot::Pending(reactions) = &mut *slot else {
                return;
            };
            let reactions = mem::take(reactions);
            *slot = Slot::Rejected(reason.clone());
            reactions
        };

        trace!(deferred = %self.inner.id, reactions = reactions.len(), "deferred rejected");

        if !self.inner.has_handler.get() {
            debug!(deferred = %self.inner.id, "deferred rejected without a handler");
            self.inner
                .handle
                .track(self.inner.id, RejectionEvent::RejectWithNoHandler);
        }

        for reaction in reactions {
            reaction.schedule(&self.inner.handle, Err(reason.clone()));
        }
    }

    /// Withdraws an earlier "rejected without handler" report.
    pub(crate) fn revoke_rejection(&self) {
        debug!(deferred = %self.inner.id, "handler added after rejection");
        self.inner
            .handle
            .track(self.inner.id, RejectionEvent::HandlerAddedAfterReject);
    }
}

impl<T, E> Drop for Inner<T, E> {
    fn drop(&mut self) {
        // Pending reactions own their downstream deferreds. Unwind the chain
        // with a worklist so a long chain does not overflow the stack.
        let mut owned = self.release();

        while let Some(next) = owned.pop() {
            if Rc::strong_count(&next) == 1 {
                owned.extend(next.release());
            }
        }
    }
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("id", &self.inner.id)
            .field("state", &self.inner.slot.borrow().state())
            .finish()
    }
}
