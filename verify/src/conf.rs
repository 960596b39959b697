// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Options of a verification run.

use runner::run::PollSchedule;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

/// What to do with trace identifiers that have no counterpart in the original
/// component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MappingPolicy {
    /// Drop the offending data from the step and keep the rest of the trace
    #[default]
    Lenient,
    /// Drop the whole trace
    Strict,
}

/// Options of a verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOptions {
    /// Prune properties already decided by earlier traces and remove
    /// redundant traces
    pub optimize: bool,
    /// Check all queries in a single verifier invocation
    pub reuse_state_space: bool,
    /// Time budget for each query
    pub timeout: Duration,
    /// Time between two checks on a running query
    pub poll_interval: Duration,
    /// Map traces recorded on derived components back to their originals
    pub back_annotate: bool,
    /// How back-annotation handles unmappable identifiers
    pub mapping: MappingPolicy,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            optimize: false,
            reuse_state_space: false,
            timeout: Duration::from_secs(60),
            poll_interval: PollSchedule::DEFAULT_INTERVAL,
            back_annotate: false,
            mapping: MappingPolicy::default(),
        }
    }
}

impl VerificationOptions {
    /// How each query is polled.
    pub fn schedule(&self) -> PollSchedule {
        PollSchedule {
            interval: self.poll_interval,
            timeout: self.timeout,
        }
    }
}

/// A flag to request cancellation of a run from another thread.
///
/// The run checks the flag before dispatching each query and between polls of
/// the query in flight, which it then kills.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[allow(missing_docs)]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
