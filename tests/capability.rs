use deferred::{
    Capability, Deferred, DeferredError, Executor, Handle, Native, Resolution, Runtime, Species,
    State,
};
use pretty_assertions::assert_eq;

use std::cell::Cell;

/// A well-behaved species counting the deferreds it constructs.
#[derive(Default)]
struct Counting {
    constructed: Cell<usize>,
}

impl Species<i32, String> for Counting {
    fn construct(
        &self,
        handle: &Handle,
        executor: Executor<i32, String>,
    ) -> Result<Deferred<i32, String>, String> {
        self.constructed.set(self.constructed.get() + 1);
        Ok(Deferred::new(handle, move |resolve, reject| {
            executor.invoke(resolve, reject).map_err(String::from)
        }))
    }
}

/// Hands the entry points to the executor twice.
struct InvokesTwice;

impl Species<i32, String> for InvokesTwice {
    fn construct(
        &self,
        handle: &Handle,
        executor: Executor<i32, String>,
    ) -> Result<Deferred<i32, String>, String> {
        Ok(Deferred::new(handle, move |resolve, reject| {
            executor.invoke(resolve.clone(), reject.clone()).map_err(String::from)?;
            assert_eq!(
                executor.invoke(resolve, reject),
                Err(DeferredError::ExecutorAlreadyInvoked)
            );
            Ok(())
        }))
    }
}

/// Never calls the executor.
struct Forgetful;

impl Species<i32, String> for Forgetful {
    fn construct(
        &self,
        handle: &Handle,
        _executor: Executor<i32, String>,
    ) -> Result<Deferred<i32, String>, String> {
        Ok(Deferred::new(handle, |_resolve, _reject| Ok(())))
    }
}

/// Fails while constructing.
struct Broken;

impl Species<i32, String> for Broken {
    fn construct(
        &self,
        _handle: &Handle,
        _executor: Executor<i32, String>,
    ) -> Result<Deferred<i32, String>, String> {
        Err("constructor failed".into())
    }
}

#[deferred::test]
fn native_capability_settles_its_deferred(rt: &Runtime) {
    let cap = Capability::<i32, String>::new(rt.handle());

    assert_eq!(cap.deferred.state(), State::Pending);
    cap.resolve.fulfill(10);
    assert_eq!(cap.deferred.result(), Some(Ok(10)));
}

#[deferred::test]
fn native_species_takes_the_fast_path(rt: &Runtime) {
    let cap = Capability::<i32, String>::with_species(rt.handle(), &Native).unwrap();

    cap.reject.reject("x".into());
    cap.resolve.fulfill(1);
    cap.deferred.mark_handled();

    assert_eq!(cap.deferred.result(), Some(Err("x".to_string())));
}

#[deferred::test]
fn native_species_construct_uses_the_executor(rt: &Runtime) {
    struct Wrapped(Native);

    impl Species<i32, String> for Wrapped {
        fn construct(
            &self,
            handle: &Handle,
            executor: Executor<i32, String>,
        ) -> Result<Deferred<i32, String>, String> {
            self.0.construct(handle, executor)
        }
    }

    let cap = Capability::<i32, String>::with_species(rt.handle(), &Wrapped(Native)).unwrap();
    cap.resolve.fulfill(2);

    assert_eq!(cap.deferred.result(), Some(Ok(2)));
}

#[deferred::test]
fn custom_species_constructs_the_deferred(rt: &Runtime) {
    let species = Counting::default();

    let cap = Capability::<i32, String>::with_species(rt.handle(), &species).unwrap();
    assert_eq!(species.constructed.get(), 1);

    cap.resolve.fulfill(4);
    cap.resolve.fulfill(5);
    assert_eq!(cap.deferred.result(), Some(Ok(4)));
}

#[deferred::test]
fn executor_invoked_twice_fails(rt: &Runtime) {

    let result = Capability::<i32, String>::with_species(rt.handle(), &InvokesTwice);

    assert_eq!(
        result.err(),
        Some(DeferredError::ExecutorAlreadyInvoked.to_string())
    );
}

#[deferred::test]
fn executor_never_invoked_fails(rt: &Runtime) {

    let result = Capability::<i32, String>::with_species(rt.handle(), &Forgetful);

    assert_eq!(
        result.err(),
        Some(DeferredError::NonCallableCapability.to_string())
    );
}

#[deferred::test]
fn constructor_error_is_propagated(rt: &Runtime) {

    let result = Capability::<i32, String>::with_species(rt.handle(), &Broken);

    assert_eq!(result.err(), Some("constructor failed".to_string()));
}

#[deferred::test]
fn species_resolve_and_reject_go_through_the_constructor(rt: &Runtime) {
    let species = Counting::default();

    let fulfilled = species.resolve(rt.handle(), Resolution::Value(1)).unwrap();
    let rejected = species.reject(rt.handle(), "r".into()).unwrap();
    rejected.mark_handled();

    assert_eq!(species.constructed.get(), 2);
    assert_eq!(fulfilled.result(), Some(Ok(1)));
    assert_eq!(rejected.result(), Some(Err("r".to_string())));
}

#[deferred::test]
fn native_species_resolve_returns_deferreds_unchanged(rt: &Runtime) {
    let cap = Capability::<i32, String>::new(rt.handle());

    let same = Species::resolve(&Native, rt.handle(), Resolution::Deferred(cap.deferred.clone())).unwrap();

    assert!(same.ptr_eq(&cap.deferred));
}

#[deferred::test]
fn species_capability_adopts_thenables(rt: &Runtime) {
    let species = Counting::default();
    let source = Capability::<i32, String>::new(rt.handle());

    let adopted = species
        .resolve(rt.handle(), Resolution::Deferred(source.deferred.clone()))
        .unwrap();
    assert!(!adopted.ptr_eq(&source.deferred));

    source.resolve.fulfill(3);
    rt.run_until_idle().unwrap();

    assert_eq!(adopted.result(), Some(Ok(3)));
}
