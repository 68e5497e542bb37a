//! Job queues: microtasks plus timers on a virtual clock.
//!
//! Nothing ever sleeps. Running a timer advances the clock to its due time,
//! so `setTimeout(fn, 1000)` costs no wall-clock time but still runs after
//! every microtask and every earlier timer.

use std::collections::{BTreeMap, VecDeque};

use crate::errors::EvalResult;
use crate::Interpreter;

/// A queued unit of work.
pub type Job = Box<dyn FnOnce(&mut Interpreter) -> EvalResult<()>>;

#[derive(Default)]
pub struct EventLoop {
    microtasks: VecDeque<Job>,
    /// Keyed by (due time, timer id) so equal deadlines run in creation order.
    timers: BTreeMap<(u64, u64), Job>,
    now: u64,
    next_timer_id: u64,
}

impl EventLoop {
    pub fn new() -> Self {
        EventLoop::default()
    }

    #[inline]
    pub fn enqueue_microtask(&mut self, job: Job) {
        self.microtasks.push_back(job);
    }

    pub fn next_microtask(&mut self) -> Option<Job> {
        self.microtasks.pop_front()
    }

    pub fn has_microtasks(&self) -> bool {
        !self.microtasks.is_empty()
    }

    /// Schedule `job` after `delay_ms` virtual milliseconds; returns its id.
    pub fn schedule(&mut self, delay_ms: u64, job: Job) -> u64 {
        self.next_timer_id += 1;
        let id = self.next_timer_id;
        self.timers.insert((self.now.saturating_add(delay_ms), id), job);
        id
    }

    /// Cancel a pending timer. Unknown ids are ignored.
    pub fn cancel(&mut self, id: u64) {
        self.timers.retain(|(_, timer_id), _| *timer_id != id);
    }

    /// Pop the earliest timer and advance the clock to its due time.
    pub fn next_timer(&mut self) -> Option<Job> {
        let (&key, _) = self.timers.iter().next()?;
        let job = self.timers.remove(&key)?;
        self.now = self.now.max(key.0);
        Some(job)
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    /// Current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Drop every queued job.
    pub fn clear(&mut self) {
        self.microtasks.clear();
        self.timers.clear();
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("microtasks", &self.microtasks.len())
            .field("timers", &self.timers.len())
            .field("now", &self.now)
            .finish()
    }
}

#[cfg(test)]
mod tests;
