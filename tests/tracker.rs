mod common;

use common::Log;
use deferred::{
    Capability, Deferred, DeferredId, RejectionEvent, RejectionTracker, Resolution, Runtime,
};
use pretty_assertions::assert_eq;

use std::cell::RefCell;
use std::rc::Rc;

/// Host tracker recording every event it receives.
#[derive(Default)]
struct Recording {
    events: RefCell<Vec<(DeferredId, RejectionEvent)>>,
}

impl RejectionTracker for Recording {
    fn track(&self, id: DeferredId, event: RejectionEvent) {
        self.events.borrow_mut().push((id, event));
    }
}

#[deferred::test]
fn fresh_deferred_is_unobserved(rt: &Runtime) {
    let cap = Capability::<i32, String>::new(rt.handle());

    assert!(!cap.deferred.is_observed());
}

#[deferred::test]
fn user_handler_observes(rt: &Runtime) {
    let cap = Capability::<i32, String>::new(rt.handle());

    cap.deferred.then(|v| Ok(Resolution::Value(v)), |_| Ok(Resolution::Value(0)));

    assert!(cap.deferred.is_observed());
}

#[deferred::test]
fn forwarding_only_chain_is_unobserved_until_caught(rt: &Runtime) {
    let cap = Capability::<i32, String>::new(rt.handle());

    let tail = cap
        .deferred
        .and_then(|v| Ok(Resolution::Value(v + 1)))
        .and_then(|v| Ok(Resolution::Value(v * 2)));
    assert!(!cap.deferred.is_observed());

    tail.catch(|_| Ok(Resolution::Value(0)));
    assert!(cap.deferred.is_observed());
}

#[deferred::test]
fn handled_hint_observes(rt: &Runtime) {
    let cap = Capability::<i32, String>::new(rt.handle());
    let tail = cap.deferred.and_then(|v| Ok(Resolution::Value(v)));

    tail.set_handled_hint();

    assert!(tail.is_observed());
    assert!(cap.deferred.is_observed());
}

#[deferred::test]
fn adoption_source_is_observed_through_its_target(rt: &Runtime) {
    let source = Capability::<i32, String>::new(rt.handle());
    let target = Capability::<i32, String>::new(rt.handle());

    target.resolve.resolve(Resolution::Deferred(source.deferred.clone()));
    assert!(!source.deferred.is_observed());

    target.deferred.catch(|_| Ok(Resolution::Value(0)));
    assert!(source.deferred.is_observed());

    rt.run_until_idle().unwrap();
    assert!(source.deferred.is_observed());
}

#[deferred::test]
fn explicit_forwarding_edge_is_followed(rt: &Runtime) {
    let inner = Capability::<i32, String>::new(rt.handle());
    let outer = Capability::<String, String>::new(rt.handle());

    inner.deferred.set_handled_by(&outer.deferred);
    assert!(!inner.deferred.is_observed());

    outer.deferred.set_handled_hint();
    assert!(inner.deferred.is_observed());
}

#[deferred::test]
fn dropped_outer_deferred_no_longer_observes(rt: &Runtime) {
    let inner = Capability::<i32, String>::new(rt.handle());

    {
        let outer = Capability::<i32, String>::new(rt.handle());
        outer.deferred.set_handled_hint();
        inner.deferred.set_handled_by(&outer.deferred);
        assert!(inner.deferred.is_observed());
    }

    assert!(!inner.deferred.is_observed());
}

#[deferred::test]
fn mutual_adoption_terminates(rt: &Runtime) {
    let a = Capability::<i32, String>::new(rt.handle());
    let b = Capability::<i32, String>::new(rt.handle());

    a.resolve.resolve(Resolution::Deferred(b.deferred.clone()));
    b.resolve.resolve(Resolution::Deferred(a.deferred.clone()));
    rt.run_until_idle().unwrap();

    assert!(!a.deferred.is_observed());
    assert!(!b.deferred.is_observed());
}

#[deferred::test]
fn rejection_without_handler_is_reported(rt: &Runtime) {

    let d = Deferred::<i32, String>::reject(rt.handle(), "x".into());

    assert_eq!(rt.take_unhandled_rejections(), vec![d.id()]);
    assert!(rt.take_unhandled_rejections().is_empty());
}

#[deferred::test]
fn late_handler_revokes_the_report(rt: &Runtime) {
    let log = Log::default();

    let d = Deferred::<i32, String>::reject(rt.handle(), "x".into());

    let seen = log.clone();
    d.catch(move |reason| {
        seen.push(reason);
        Ok(Resolution::Value(0))
    });
    rt.run_until_idle().unwrap();

    assert!(rt.take_unhandled_rejections().is_empty());
    assert_eq!(log.entries(), vec!["x"]);
}

#[deferred::test]
fn mark_handled_suppresses_and_revokes(rt: &Runtime) {

    let early = Capability::<i32, String>::new(rt.handle());
    early.deferred.mark_handled();
    early.reject.reject("a".into());

    let late = Deferred::<i32, String>::reject(rt.handle(), "b".into());
    late.mark_handled();

    assert!(rt.take_unhandled_rejections().is_empty());
}

#[deferred::test]
fn rejection_is_reported_where_the_chain_ends(rt: &Runtime) {
    let cap = Capability::<i32, String>::new(rt.handle());
    let tail = cap.deferred.and_then(|v| Ok(Resolution::Value(v)));

    cap.reject.reject("deep".into());
    assert!(rt.take_unhandled_rejections().is_empty());

    rt.run_until_idle().unwrap();
    assert_eq!(rt.take_unhandled_rejections(), vec![tail.id()]);
}

#[test]
fn host_tracker_receives_both_events() {
    let tracker = Rc::new(Recording::default());
    let rt = Runtime::builder().rejection_tracker(tracker.clone()).build();

    let d = Deferred::<i32, String>::reject(rt.handle(), "x".into());
    d.catch(|_| Ok(Resolution::Value(0)));
    d.catch(|_| Ok(Resolution::Value(1)));

    assert_eq!(
        *tracker.events.borrow(),
        vec![
            (d.id(), RejectionEvent::RejectWithNoHandler),
            (d.id(), RejectionEvent::HandlerAddedAfterReject),
        ]
    );
    assert!(rt.take_unhandled_rejections().is_empty());
}

#[test]
fn bundled_tracker_can_be_disabled() {
    let rt = Runtime::builder().track_unhandled(false).build();

    Deferred::<i32, String>::reject(rt.handle(), "x".into());

    assert!(rt.take_unhandled_rejections().is_empty());
}

#[deferred::test]
fn caught_deferred_stays_observed_after_rejection(rt: &Runtime) {
    let cap = Capability::<i32, String>::new(rt.handle());
    cap.deferred.catch(|_| Ok(Resolution::Value(0)));
    assert!(cap.deferred.is_observed());

    cap.reject.reject("x".into());
    assert!(cap.deferred.is_observed());

    rt.run_until_idle().unwrap();
    assert!(cap.deferred.is_observed());
}

#[deferred::test]
fn uncaught_chain_stays_unobserved_after_rejection(rt: &Runtime) {
    let cap = Capability::<i32, String>::new(rt.handle());
    let tail = cap.deferred.and_then(|v| Ok(Resolution::Value(v)));

    cap.reject.reject("x".into());
    assert!(!cap.deferred.is_observed());

    tail.catch(|_| Ok(Resolution::Value(0)));
    assert!(cap.deferred.is_observed());
}

#[deferred::test]
fn walk_handles_deep_forwarding_chains(rt: &Runtime) {
    let cap = Capability::<i32, String>::new(rt.handle());

    let mut tail = cap.deferred.clone();
    for _ in 0..100_000 {
        tail = tail.and_then(|v| Ok(Resolution::Value(v)));
    }
    assert!(!cap.deferred.is_observed());

    tail.catch(|_| Ok(Resolution::Value(0)));
    assert!(cap.deferred.is_observed());
}
