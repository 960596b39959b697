// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Track and kill the external process of a verifier invocation.

use nix::{errno::Errno, sys::signal, unistd::Pid};
use std::{
    io,
    os::unix::process::CommandExt,
    process::{Child, Command, Output, Stdio},
    sync::{Arc, Mutex},
};
use thiserror::Error;

/// The states that the process slot can be in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Status {
    /// No process is currently running.
    Idle,
    /// A process is running (or has exited but not yet been reaped, so its pid
    /// cannot have been reused).
    Running(Pid),
    /// The invocation was killed. Any process still to be spawned is refused.
    Killed,
}

#[derive(Error, Debug)]
/// An error from running a verifier process
pub enum RunnerError {
    /// I/O went wrong
    #[error("some I/O went wrong: {0}")]
    Io(#[from] io::Error),
    /// Verifier killed specifically by SIGKILL signal
    #[error("verifier was killed")]
    Killed,
}

type Result<T> = std::result::Result<T, RunnerError>;

/// A handle to the processes of one verifier invocation, for cancelling it.
///
/// Processes are spawned through the handle so that a kill can never miss a
/// process started concurrently with it.
#[derive(Clone, Debug)]
pub struct ProcPid {
    // cleared on release so we don't try to kill the process long afterward
    // when the pid might have been reused
    status: Arc<Mutex<Status>>,
}

impl Default for ProcPid {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcPid {
    /// A handle with no process.
    pub fn new() -> Self {
        Self {
            status: Arc::new(Mutex::new(Status::Idle)),
        }
    }

    /// Spawn a process and register it for cancellation.
    ///
    /// The process leads a new process group, so killing it also kills any
    /// verifier it started in turn.
    pub fn spawn(&self, command: &mut Command) -> Result<Child> {
        let mut status = self.status.lock().unwrap();
        if *status == Status::Killed {
            return Err(RunnerError::Killed);
        }
        let child = command.process_group(0).spawn()?;
        // Child guarantees a positive pid that fits in a pid_t
        let pid = Pid::from_raw(child.id() as i32);
        *status = Status::Running(pid);
        Ok(child)
    }

    /// Unregister the process after it has been reaped.
    pub fn release(&self) {
        let mut status = self.status.lock().unwrap();
        if let Status::Running(_) = *status {
            *status = Status::Idle;
        }
    }

    /// Kill the registered process group, if any, and refuse to spawn any more.
    /// Killing is idempotent.
    pub fn kill(&self) {
        let mut status = self.status.lock().unwrap();
        if let Status::Running(pid) = *status {
            log::debug!("killing verifier process {pid}");
            let r = signal::killpg(pid, signal::Signal::SIGKILL);
            if let Err(errno) = r {
                if errno != Errno::ESRCH {
                    log::warn!("killing verifier process {pid} failed with {errno}");
                }
            }
        }
        *status = Status::Killed;
    }

    /// Whether [`ProcPid::kill`] has been called.
    pub fn is_killed(&self) -> bool {
        *self.status.lock().unwrap() == Status::Killed
    }

    /// Run a command to completion, capturing its output.
    ///
    /// Returns [`RunnerError::Killed`] if the invocation was killed before or
    /// while the process ran.
    pub fn output(&self, command: &mut Command) -> Result<Output> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let child = self.spawn(command)?;
        let output = child.wait_with_output();
        self.release();
        let output = output?;
        if self.is_killed() {
            return Err(RunnerError::Killed);
        }
        Ok(output)
    }
}
