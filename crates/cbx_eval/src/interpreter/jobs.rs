//! Driving the event loop.
//!
//! Hosts drive the queues from outside script code: to idle, or until one
//! promise they wait on settles. A promise still pending once no job is left
//! can never settle.

use super::Interpreter;
use crate::errors::{EvalResult, Interrupt};
use crate::event_loop::Job;
use crate::value::{ObjRef, PromiseState, Value};

impl Interpreter {
    pub fn enqueue_job(&mut self, job: Job) {
        self.event_loop.enqueue_microtask(job);
    }

    /// Run `job`. A throw nobody catches is recorded as uncaught; only
    /// termination propagates.
    fn run_job(&mut self, job: Job) -> EvalResult<()> {
        self.check_deadline()?;
        match job(self) {
            Ok(())
            | Err(
                Interrupt::Return(_)
                | Interrupt::Break
                | Interrupt::Continue
                | Interrupt::Suspend,
            ) => Ok(()),
            Err(Interrupt::Throw(error)) => {
                tracing::debug!(error = %self.inspect(&error), "uncaught exception in job");
                self.uncaught.push(error);
                Ok(())
            }
            Err(terminate @ Interrupt::Terminate(_)) => Err(terminate),
        }
    }

    /// Run microtasks until the queue is empty.
    pub fn run_microtasks(&mut self) -> EvalResult<()> {
        while let Some(job) = self.event_loop.next_microtask() {
            self.run_job(job)?;
        }
        Ok(())
    }

    /// Run one unit of work: a microtask if any, else the next timer.
    /// Returns `false` when nothing was queued.
    fn run_one(&mut self) -> EvalResult<bool> {
        if let Some(job) = self.event_loop.next_microtask() {
            self.run_job(job)?;
            return Ok(true);
        }
        if let Some(job) = self.event_loop.next_timer() {
            self.run_job(job)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Run microtasks and timers until both queues are empty.
    pub fn run_until_idle(&mut self) -> EvalResult<()> {
        while self.run_one()? {}
        Ok(())
    }

    /// Run jobs until `promise` settles or no work is left; returns whether
    /// it settled.
    pub fn run_until_settled(&mut self, promise: &ObjRef) -> EvalResult<bool> {
        loop {
            if !matches!(self.promise_state(promise), Some(PromiseState::Pending)) {
                return Ok(true);
            }
            if !self.run_one()? {
                return Ok(false);
            }
        }
    }

    /// Exceptions thrown by jobs that nothing caught, oldest first.
    pub fn take_uncaught(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.uncaught)
    }
}
