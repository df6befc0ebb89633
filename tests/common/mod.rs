#![allow(dead_code)]

use deferred::{Deferred, Handle, Resolution};

use std::cell::RefCell;
use std::rc::Rc;

/// A deferred fulfilled with `value` after `hops` reaction jobs.
pub fn delayed(handle: &Handle, value: i32, hops: usize) -> Deferred<i32, String> {
    let mut current = Deferred::resolve(handle, Resolution::Value(value));
    for _ in 0..hops {
        current = current.and_then(|v| Ok(Resolution::Value(v)));
    }
    current
}

/// A deferred rejected with `reason` after `hops + 1` reaction jobs.
pub fn delayed_reject(handle: &Handle, reason: &str, hops: usize) -> Deferred<i32, String> {
    let reason = reason.to_string();
    delayed(handle, 0, hops).and_then(move |_| Err(reason))
}

/// Shared log of events, in the order they happened.
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}
