#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::*;
use crate::{Interpreter, Realm};

type Log = Rc<RefCell<Vec<&'static str>>>;

fn push(log: &Log, entry: &'static str) -> Job {
    let log = Rc::clone(log);
    Box::new(move |_| {
        log.borrow_mut().push(entry);
        Ok(())
    })
}

fn drain(event_loop: &mut EventLoop) {
    let mut interp = Interpreter::new(Realm::new());
    loop {
        let job = match event_loop.next_microtask() {
            Some(job) => job,
            None => match event_loop.next_timer() {
                Some(job) => job,
                None => break,
            },
        };
        job(&mut interp).unwrap();
    }
}

#[test]
fn microtasks_run_before_timers() {
    let log = Log::default();
    let mut event_loop = EventLoop::new();
    event_loop.schedule(0, push(&log, "timer"));
    event_loop.enqueue_microtask(push(&log, "micro"));
    drain(&mut event_loop);
    assert_eq!(*log.borrow(), ["micro", "timer"]);
}

#[test]
fn timers_order_by_due_time_then_creation() {
    let log = Log::default();
    let mut event_loop = EventLoop::new();
    event_loop.schedule(30, push(&log, "late"));
    event_loop.schedule(10, push(&log, "first"));
    event_loop.schedule(10, push(&log, "second"));
    drain(&mut event_loop);
    assert_eq!(*log.borrow(), ["first", "second", "late"]);
    assert_eq!(event_loop.now(), 30);
}

#[test]
fn cancelled_timers_never_run() {
    let log = Log::default();
    let mut event_loop = EventLoop::new();
    let id = event_loop.schedule(5, push(&log, "cancelled"));
    event_loop.schedule(6, push(&log, "kept"));
    event_loop.cancel(id);
    event_loop.cancel(9999);
    drain(&mut event_loop);
    assert_eq!(*log.borrow(), ["kept"]);
}

#[test]
fn clear_drops_everything() {
    let log = Log::default();
    let mut event_loop = EventLoop::new();
    event_loop.schedule(1, push(&log, "timer"));
    event_loop.enqueue_microtask(push(&log, "micro"));
    event_loop.clear();
    assert!(!event_loop.has_microtasks());
    assert!(!event_loop.has_timers());
    drain(&mut event_loop);
    assert!(log.borrow().is_empty());
}
