use super::capability::{Capability, Native, RejectFn, ResolveFn, Species};
use super::reaction::{Handler, HandlerKind};
use super::{Deferred, Reason, Resolution, Value};
use crate::runtime::Handle;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Bookkeeping shared by the elements of one `all`.
struct AllState<T> {
    /// One slot per element, in input order.
    values: RefCell<Vec<Option<T>>>,

    /// Elements not fulfilled yet, plus one while the input is being read.
    remaining: Cell<usize>,
}

impl<T: Value> AllState<T> {
    /// Counts one element (or the input itself) as done.
    ///
    /// Returns the collected values once nothing is left.
    fn complete_one(&self) -> Option<Vec<T>> {
        let remaining = self.remaining.get() - 1;
        self.remaining.set(remaining);

        if remaining > 0 {
            return None;
        }

        // Every slot was written exactly once by the time the count drops
        // to zero.
        Some(self.values.take().into_iter().flatten().collect())
    }
}

impl<T: Value, E: Reason> Deferred<T, E> {
    /// Waits for every input to fulfill.
    ///
    /// Fulfills with the values in input order, or rejects with the reason
    /// of the first input to reject. An empty input fulfills with an empty
    /// vector.
    pub fn all<I>(handle: &Handle, inputs: I) -> Deferred<Vec<T>, E>
    where
        I: IntoIterator<Item = Resolution<T, E>>,
    {
        Self::try_all(handle, inputs.into_iter().map(Ok))
    }

    /// Like [`all`](Self::all), reading from a fallible source.
    ///
    /// An `Err` item stops reading and rejects the output with that error.
    pub fn try_all<I>(handle: &Handle, inputs: I) -> Deferred<Vec<T>, E>
    where
        I: IntoIterator<Item = Result<Resolution<T, E>, E>>,
    {
        // The native species never fails to construct.
        Self::try_all_in(handle, &Native, inputs)
            .unwrap_or_else(|reason| Deferred::reject(handle, reason))
    }

    /// Like [`try_all`](Self::try_all), building the output and coercing
    /// every input through `species`.
    ///
    /// # Errors
    ///
    /// Fails when `species` cannot produce the output capability. Failing
    /// to coerce an input rejects the output instead.
    pub fn try_all_in<S, I>(
        handle: &Handle,
        species: &S,
        inputs: I,
    ) -> Result<Deferred<Vec<T>, E>, E>
    where
        S: Species<T, E> + Species<Vec<T>, E> + ?Sized,
        I: IntoIterator<Item = Result<Resolution<T, E>, E>>,
    {
        let output = Capability::<Vec<T>, E>::with_species(handle, species)?;
        let state = Rc::new(AllState {
            values: RefCell::new(Vec::new()),
            remaining: Cell::new(1),
        });

        for (index, input) in inputs.into_iter().enumerate() {
            let next = match coerce(handle, species, input) {
                Ok(next) => next,
                Err(reason) => {
                    output.reject.reject(reason);
                    return Ok(output.deferred);
                }
            };

            state.values.borrow_mut().push(None);
            state.remaining.set(state.remaining.get() + 1);

            let throwaway = next.react(
                resolve_element(index, state.clone(), output.resolve.clone()),
                forward_rejection(output.reject.clone()),
                HandlerKind::Forwarding,
            );
            throwaway.set_handled_by(&output.deferred);
        }

        if let Some(values) = state.complete_one() {
            output.resolve.fulfill(values);
        }

        Ok(output.deferred)
    }

    /// Settles like the first input to settle, in either direction.
    ///
    /// Later settlements are ignored. An empty input never settles.
    pub fn race<I>(handle: &Handle, inputs: I) -> Deferred<T, E>
    where
        I: IntoIterator<Item = Resolution<T, E>>,
    {
        Self::try_race(handle, inputs.into_iter().map(Ok))
    }

    /// Like [`race`](Self::race), reading from a fallible source.
    ///
    /// An `Err` item stops reading and rejects the output with that error,
    /// unless an input already settled it.
    pub fn try_race<I>(handle: &Handle, inputs: I) -> Deferred<T, E>
    where
        I: IntoIterator<Item = Result<Resolution<T, E>, E>>,
    {
        Self::try_race_in(handle, &Native, inputs)
            .unwrap_or_else(|reason| Deferred::reject(handle, reason))
    }

    /// Like [`try_race`](Self::try_race), building the output and coercing
    /// every input through `species`.
    ///
    /// # Errors
    ///
    /// Fails when `species` cannot produce the output capability. Failing
    /// to coerce an input rejects the output instead.
    pub fn try_race_in<S, I>(
        handle: &Handle,
        species: &S,
        inputs: I,
    ) -> Result<Deferred<T, E>, E>
    where
        S: Species<T, E> + ?Sized,
        I: IntoIterator<Item = Result<Resolution<T, E>, E>>,
    {
        let output = Capability::<T, E>::with_species(handle, species)?;

        for input in inputs {
            let next = match coerce(handle, species, input) {
                Ok(next) => next,
                Err(reason) => {
                    output.reject.reject(reason);
                    return Ok(output.deferred);
                }
            };

            let resolve = output.resolve.clone();
            let throwaway = next.react(
                Box::new(move |value| {
                    resolve.fulfill(value);
                    Ok(Resolution::Value(()))
                }),
                forward_rejection(output.reject.clone()),
                HandlerKind::Forwarding,
            );
            throwaway.set_handled_by(&output.deferred);
        }

        Ok(output.deferred)
    }
}

/// Reads one input and coerces it with the resolve helper of `species`.
fn coerce<T, E, S>(
    handle: &Handle,
    species: &S,
    input: Result<Resolution<T, E>, E>,
) -> Result<Deferred<T, E>, E>
where
    T: Value,
    E: Reason,
    S: Species<T, E> + ?Sized,
{
    <S as Species<T, E>>::resolve(species, handle, input?)
}

/// Fulfillment handler recording the value of element `index`.
///
/// The handler is `FnOnce` and is fed from the guarded entry points of its
/// element, so a thenable calling its resolver twice still counts once.
fn resolve_element<T: Value, E: Reason>(
    index: usize,
    state: Rc<AllState<T>>,
    resolve: ResolveFn<Vec<T>, E>,
) -> Handler<T, (), E> {
    Box::new(move |value| {
        state.values.borrow_mut()[index] = Some(value);

        if let Some(values) = state.complete_one() {
            resolve.fulfill(values);
        }

        Ok(Resolution::Value(()))
    })
}

/// Rejection handler passing the reason to the combinator output.
fn forward_rejection<E: Reason>(reject: RejectFn<E>) -> Handler<E, (), E> {
    Box::new(move |reason| {
        reject.reject(reason);
        Ok(Resolution::Value(()))
    })
}
