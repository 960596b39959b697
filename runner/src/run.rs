// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! A verifier invocation running in the background, observed by polling.

use crate::proc::ProcPid;
use std::{
    mem,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

/// The states that a run can be in.
#[derive(Debug)]
enum RunState<T> {
    /// The job is still executing.
    Running,
    /// The job finished and its result has not been taken yet.
    Done(T),
    /// The result was taken with [`VerifierRun::take_result`].
    Taken,
    /// The run was cancelled before the job finished. A result arriving later
    /// is discarded.
    Cancelled,
}

/// A handle to a job executing a verifier invocation on a background thread.
///
/// The job receives a [`ProcPid`] that it must use to spawn its processes, so
/// that [`VerifierRun::cancel`] can kill them. Dropping the handle cancels the
/// run hard.
#[derive(Debug)]
pub struct VerifierRun<T> {
    state: Arc<Mutex<RunState<T>>>,
    pid: ProcPid,
}

impl<T: Send + 'static> VerifierRun<T> {
    /// Start a job. Returns immediately.
    pub fn start<F>(job: F) -> Self
    where
        F: FnOnce(&ProcPid) -> T + Send + 'static,
    {
        let state = Arc::new(Mutex::new(RunState::Running));
        let pid = ProcPid::new();
        let job_state = state.clone();
        let job_pid = pid.clone();
        thread::spawn(move || {
            let r = job(&job_pid);
            let mut state = job_state.lock().unwrap();
            if let RunState::Running = *state {
                *state = RunState::Done(r);
            }
        });
        Self { state, pid }
    }
}

impl<T> VerifierRun<T> {
    /// Whether the job ran to completion.
    pub fn is_done(&self) -> bool {
        matches!(
            *self.state.lock().unwrap(),
            RunState::Done(_) | RunState::Taken
        )
    }

    /// Whether the run was cancelled before completing.
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.state.lock().unwrap(), RunState::Cancelled)
    }

    /// Cancel the run. A hard cancellation also kills the verifier process.
    ///
    /// Cancelling a run that already completed or was already cancelled does
    /// nothing.
    pub fn cancel(&self, hard: bool) {
        let mut state = self.state.lock().unwrap();
        if let RunState::Running = *state {
            *state = RunState::Cancelled;
            if hard {
                self.pid.kill();
            }
        }
    }

    /// Take the result of a completed run. Returns `None` if the run is still
    /// going, was cancelled, or its result was already taken.
    pub fn take_result(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        match mem::replace(&mut *state, RunState::Taken) {
            RunState::Done(r) => Some(r),
            other => {
                *state = other;
                None
            }
        }
    }
}

impl<T> Drop for VerifierRun<T> {
    fn drop(&mut self) {
        self.cancel(true);
    }
}

/// How often to check on a run and how long to wait for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Time between two checks
    pub interval: Duration,
    /// Overall time budget
    pub timeout: Duration,
}

impl PollSchedule {
    /// The default polling interval
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(250);

    /// Poll every [`PollSchedule::DEFAULT_INTERVAL`] for at most `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            interval: Self::DEFAULT_INTERVAL,
            timeout,
        }
    }

    /// The number of polls that fit in the time budget. A run always gets at
    /// least one poll, even if the timeout is shorter than the interval.
    pub fn budget(&self) -> u128 {
        (self.timeout.as_millis() / self.interval.as_millis().max(1)).max(1)
    }

    /// Time to sleep between two polls, never longer than the timeout.
    pub fn pause(&self) -> Duration {
        self.interval.min(self.timeout)
    }
}

/// How a poll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The run completed
    Done,
    /// The poll budget ran out before the run completed
    TimedOut,
    /// The run was cancelled or `interrupted` returned true
    Interrupted,
}

/// Wait for a run by polling it, giving up after the schedule's budget of
/// polls. `interrupted` is checked between polls.
///
/// The run is left as is: on a timeout or interruption it is up to the caller
/// to cancel it.
pub fn poll<T, F>(run: &VerifierRun<T>, schedule: &PollSchedule, interrupted: F) -> PollOutcome
where
    F: Fn() -> bool,
{
    let budget = schedule.budget();
    let mut polls: u128 = 0;
    loop {
        if run.is_done() {
            return PollOutcome::Done;
        }
        if run.is_cancelled() || interrupted() {
            return PollOutcome::Interrupted;
        }
        if polls >= budget {
            return PollOutcome::TimedOut;
        }
        thread::sleep(schedule.pause());
        polls += 1;
    }
}
