//! Rejection observability.
//!
//! Two diagnostics live here:
//! - the observability walk behind [`Deferred::is_observed`], which answers
//!   whether a rejection will ever reach a handler written by user code,
//! - the host hook ([`RejectionTracker`]) notified when a deferred is
//!   rejected with no handler attached, and when one is attached later.
//!
//! Neither affects settlement. An unhandled rejection is only ever reported.

use super::core::Inner;
use super::reaction::{HandlerKind, Reaction};
use super::state::{DeferredId, Slot};
use super::{Deferred, Reason, Value};

use std::cell::RefCell;
use std::collections::HashSet;
use std::mem;
use std::rc::{Rc, Weak};

use tracing::trace;

/// Type-erased view of a deferred.
///
/// Reactions and forwarding edges cross value types (a combinator turns
/// `Deferred<T, E>` inputs into a `Deferred<Vec<T>, E>`), so the graph is
/// walked through this trait rather than through `Deferred<T, E>` itself.
pub(crate) trait Observe {
    fn id(&self) -> DeferredId;

    /// Carries the handled hint, or a rejection handler written by user code.
    fn observed_here(&self) -> bool;

    /// Deferreds a rejection of this one is forwarded into, in walk order.
    fn forwards_to(&self) -> Vec<Rc<dyn Observe>>;

    /// Drops the pending reactions and hands back the deferreds they owned.
    fn release(&self) -> Vec<Rc<dyn Observe>>;
}

/// Diagnostic record of one attached reaction.
///
/// Unlike the reaction itself, the record survives settlement.
pub(crate) struct Edge {
    kind: HandlerKind,
    downstream: Option<Weak<dyn Observe>>,
}

impl Edge {
    pub(crate) fn of<T, E>(reaction: &Reaction<T, E>) -> Self {
        Self {
            kind: reaction.reject_kind,
            downstream: reaction.downstream.as_ref().map(Rc::downgrade),
        }
    }
}

impl<T, E> Observe for Inner<T, E> {
    fn id(&self) -> DeferredId {
        self.id
    }

    fn observed_here(&self) -> bool {
        self.handled_hint.get()
            || self
                .edges
                .borrow()
                .iter()
                .any(|edge| edge.kind == HandlerKind::User)
    }

    fn forwards_to(&self) -> Vec<Rc<dyn Observe>> {
        let outer = self.handled_by.borrow().as_ref().and_then(Weak::upgrade);

        let edges = self.edges.borrow();
        let downstream = edges
            .iter()
            .filter(|edge| edge.kind == HandlerKind::Forwarding)
            .filter_map(|edge| edge.downstream.as_ref().and_then(Weak::upgrade));

        outer.into_iter().chain(downstream).collect()
    }

    fn release(&self) -> Vec<Rc<dyn Observe>> {
        let Ok(mut slot) = self.slot.try_borrow_mut() else {
            return Vec::new();
        };
        let Slot::Pending(reactions) = &mut *slot else {
            return Vec::new();
        };
        let reactions = mem::take(reactions);
        drop(slot);

        reactions
            .into_iter()
            .filter_map(|reaction| reaction.downstream)
            .collect()
    }
}

/// Depth-first search for an observed deferred reachable from `start`.
fn walk(start: Rc<dyn Observe>) -> bool {
    let mut visited = HashSet::new();
    let mut stack = vec![start];

    while let Some(node) = stack.pop() {
        // Mutual adoption can close a loop of forwarding edges.
        if !visited.insert(Rc::as_ptr(&node) as *const ()) {
            continue;
        }

        if node.observed_here() {
            return true;
        }

        stack.extend(node.forwards_to().into_iter().rev());
    }

    false
}

impl<T: Value, E: Reason> Deferred<T, E> {
    /// Returns `true` if a rejection of this deferred would reach a handler
    /// supplied by user code.
    ///
    /// The walk is depth-first. A deferred is observed when it carries the
    /// handled hint, when the outer deferred it forwards into is observed,
    /// or when one of its reactions has a user rejection handler. Internal
    /// forwarding reactions are followed to their downstream deferred.
    ///
    /// Reactions are remembered after settlement, so the answer stays
    /// meaningful once the deferred is rejected.
    pub fn is_observed(&self) -> bool {
        walk(self.inner.clone())
    }

    /// Marks this deferred as handled by an enclosing construct, such as a
    /// surrounding error-catching scope.
    pub fn set_handled_hint(&self) {
        self.inner.handled_hint.set(true);
    }

    /// Records that a rejection of this deferred is forwarded into `outer`.
    ///
    /// The edge is weak: it never keeps `outer` alive.
    pub fn set_handled_by<U: Value>(&self, outer: &Deferred<U, E>) {
        trace!(deferred = %self.inner.id, outer = %outer.inner.id, "forwarding edge recorded");
        let outer = Rc::downgrade(&outer.inner) as Weak<dyn Observe>;
        *self.inner.handled_by.borrow_mut() = Some(outer);
    }
}

/// Events reported to a [`RejectionTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionEvent {
    /// The deferred was rejected while no handler was attached.
    RejectWithNoHandler,

    /// A handler was attached to a deferred that had been rejected without
    /// one, or its rejection was adopted by another deferred.
    HandlerAddedAfterReject,
}

/// Host hook for unhandled-rejection reporting.
pub trait RejectionTracker {
    /// Called with the id of the deferred the event concerns.
    fn track(&self, id: DeferredId, event: RejectionEvent);
}

/// The bundled tracker: the ordered set of currently unhandled rejections.
///
/// An id is added on [`RejectionEvent::RejectWithNoHandler`] and removed on
/// [`RejectionEvent::HandlerAddedAfterReject`].
#[derive(Debug, Default)]
pub struct UnhandledRejections {
    ids: RefCell<Vec<DeferredId>>,
}

impl UnhandledRejections {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of unhandled rejections.
    pub fn len(&self) -> usize {
        self.ids.borrow().len()
    }

    /// Returns `true` if every rejection so far was handled.
    pub fn is_empty(&self) -> bool {
        self.ids.borrow().is_empty()
    }

    /// Returns and clears the unhandled rejections, oldest first.
    pub fn take(&self) -> Vec<DeferredId> {
        self.ids.take()
    }
}

impl RejectionTracker for UnhandledRejections {
    fn track(&self, id: DeferredId, event: RejectionEvent) {
        let mut ids = self.ids.borrow_mut();

        match event {
            RejectionEvent::RejectWithNoHandler => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            RejectionEvent::HandlerAddedAfterReject => ids.retain(|&other| other != id),
        }
    }
}
