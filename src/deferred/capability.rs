use super::{Deferred, Reason, Resolution, Value};
use crate::error::DeferredError;
use crate::runtime::Handle;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Entry point resolving a deferred.
///
/// Engine-minted resolve functions share a single "already resolved" cell
/// with their reject counterpart: only the first call of either one has an
/// effect. Host code may wrap any callable with [`ResolveFn::new`], for
/// instance inside a custom [`Species`].
pub struct ResolveFn<T, E> {
    call: Rc<dyn Fn(Resolution<T, E>)>,
}

impl<T, E> ResolveFn<T, E> {
    /// Wraps an arbitrary callable.
    pub fn new(call: impl Fn(Resolution<T, E>) + 'static) -> Self {
        Self {
            call: Rc::new(call),
        }
    }

    /// Resolves the target with `resolution`.
    pub fn resolve(&self, resolution: Resolution<T, E>) {
        (self.call)(resolution)
    }

    /// Resolves the target with a plain value.
    pub fn fulfill(&self, value: T) {
        self.resolve(Resolution::Value(value))
    }
}

impl<T, E> Clone for ResolveFn<T, E> {
    fn clone(&self) -> Self {
        Self {
            call: self.call.clone(),
        }
    }
}

impl<T, E> fmt::Debug for ResolveFn<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResolveFn")
    }
}

/// Entry point rejecting a deferred.
///
/// See [`ResolveFn`] for the single-use guarantee.
pub struct RejectFn<E> {
    call: Rc<dyn Fn(E)>,
}

impl<E> RejectFn<E> {
    /// Wraps an arbitrary callable.
    pub fn new(call: impl Fn(E) + 'static) -> Self {
        Self {
            call: Rc::new(call),
        }
    }

    /// Rejects the target with `reason`.
    pub fn reject(&self, reason: E) {
        (self.call)(reason)
    }
}

impl<E> Clone for RejectFn<E> {
    fn clone(&self) -> Self {
        Self {
            call: self.call.clone(),
        }
    }
}

impl<E> fmt::Debug for RejectFn<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RejectFn")
    }
}

/// Mints the guarded resolve/reject pair of `target`.
///
/// Both functions capture the same cell; whichever is called first flips
/// it and every later call of either one is ignored.
pub(crate) fn resolving_functions<T: Value, E: Reason>(
    target: &Deferred<T, E>,
) -> (ResolveFn<T, E>, RejectFn<E>) {
    let already_resolved = Rc::new(Cell::new(false));

    let resolve = {
        let already_resolved = already_resolved.clone();
        let target = target.clone();
        ResolveFn::new(move |resolution| {
            if already_resolved.replace(true) {
                return;
            }
            target.resolve_with(resolution);
        })
    };

    let reject = {
        let target = target.clone();
        RejectFn::new(move |reason| {
            if already_resolved.replace(true) {
                return;
            }
            target.reject_with(reason);
        })
    };

    (resolve, reject)
}

/// A deferred bundled with its resolve and reject entry points.
pub struct Capability<T, E> {
    /// The deferred settled through the entry points.
    pub deferred: Deferred<T, E>,

    /// Resolves `deferred`.
    pub resolve: ResolveFn<T, E>,

    /// Rejects `deferred`.
    pub reject: RejectFn<E>,
}

impl<T: Value, E: Reason> Capability<T, E> {
    /// Creates a pending native deferred together with its entry points.
    pub fn new(handle: &Handle) -> Self {
        let deferred = Deferred::pending(handle);
        let (resolve, reject) = resolving_functions(&deferred);

        Self {
            deferred,
            resolve,
            reject,
        }
    }

    /// Creates a capability through a constructor-like `species`.
    ///
    /// The native species takes the fast path of [`Capability::new`]. Any
    /// other species is handed an [`Executor`] that must be invoked exactly
    /// once, synchronously, while constructing.
    ///
    /// # Errors
    ///
    /// Fails with [`DeferredError::ExecutorAlreadyInvoked`] when the executor
    /// was invoked more than once, with
    /// [`DeferredError::NonCallableCapability`] when it was never invoked,
    /// and with whatever error `species` itself returns.
    pub fn with_species<S>(handle: &Handle, species: &S) -> Result<Self, E>
    where
        S: Species<T, E> + ?Sized,
    {
        if species.is_native() {
            return Ok(Self::new(handle));
        }

        let executor = Executor::new();
        let deferred = species.construct(handle, executor.clone())?;

        let (resolve, reject) = executor.into_entry_points()?;

        Ok(Self {
            deferred,
            resolve,
            reject,
        })
    }
}

/// Stored entry points of a capability under construction.
struct ExecutorSlot<T, E> {
    resolve: Option<ResolveFn<T, E>>,
    reject: Option<RejectFn<E>>,
    invoked_again: bool,
}

/// Executor handed to a [`Species`] while it constructs a deferred.
///
/// Cloning shares the slot, so the species may move the executor into an
/// executor closure while the factory keeps its own copy.
pub struct Executor<T, E> {
    slot: Rc<RefCell<ExecutorSlot<T, E>>>,
}

impl<T, E> Executor<T, E> {
    fn new() -> Self {
        Self {
            slot: Rc::new(RefCell::new(ExecutorSlot {
                resolve: None,
                reject: None,
                invoked_again: false,
            })),
        }
    }

    /// Stores the entry points of the deferred being constructed.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::ExecutorAlreadyInvoked`] if entry points
    /// were already stored. The first pair is kept, but the capability
    /// factory fails afterwards.
    pub fn invoke(&self, resolve: ResolveFn<T, E>, reject: RejectFn<E>) -> Result<(), DeferredError> {
        let mut slot = self.slot.borrow_mut();

        if slot.resolve.is_some() || slot.reject.is_some() {
            slot.invoked_again = true;
            return Err(DeferredError::ExecutorAlreadyInvoked);
        }

        slot.resolve = Some(resolve);
        slot.reject = Some(reject);
        Ok(())
    }

    fn into_entry_points(self) -> Result<(ResolveFn<T, E>, RejectFn<E>), DeferredError> {
        let mut slot = self.slot.borrow_mut();

        if slot.invoked_again {
            return Err(DeferredError::ExecutorAlreadyInvoked);
        }

        match (slot.resolve.take(), slot.reject.take()) {
            (Some(resolve), Some(reject)) => Ok((resolve, reject)),
            _ => Err(DeferredError::NonCallableCapability),
        }
    }
}

impl<T, E> Clone for Executor<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

/// A constructor-like producer of deferreds.
///
/// A species decides how the deferreds of a capability are built. The
/// engine's own constructor is [`Native`]; hosts can implement the trait to
/// wrap construction, for instance to tag or instrument every deferred.
pub trait Species<T: Value, E: Reason> {
    /// Constructs a deferred, passing its entry points to `executor`.
    fn construct(&self, handle: &Handle, executor: Executor<T, E>) -> Result<Deferred<T, E>, E>;

    /// Returns `true` for the engine's own constructor.
    fn is_native(&self) -> bool {
        false
    }

    /// Coerces `resolution` into a deferred of this species.
    fn resolve(&self, handle: &Handle, resolution: Resolution<T, E>) -> Result<Deferred<T, E>, E> {
        if self.is_native() {
            return Ok(Deferred::resolve(handle, resolution));
        }

        let capability = Capability::with_species(handle, self)?;
        capability.resolve.resolve(resolution);
        Ok(capability.deferred)
    }

    /// Creates a deferred of this species rejected with `reason`.
    fn reject(&self, handle: &Handle, reason: E) -> Result<Deferred<T, E>, E> {
        if self.is_native() {
            return Ok(Deferred::reject(handle, reason));
        }

        let capability = Capability::with_species(handle, self)?;
        capability.reject.reject(reason);
        Ok(capability.deferred)
    }
}

/// The engine's own constructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct Native;

impl<T: Value, E: Reason> Species<T, E> for Native {
    fn construct(&self, handle: &Handle, executor: Executor<T, E>) -> Result<Deferred<T, E>, E> {
        Ok(Deferred::new(handle, move |resolve, reject| {
            executor.invoke(resolve, reject).map_err(E::from)
        }))
    }

    fn is_native(&self) -> bool {
        true
    }
}
