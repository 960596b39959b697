// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! One verifier invocation: a query file plus a background run of a backend.

use crate::{
    imp::{Backend, BackendError, Outcome},
    query::QueryArtifact,
};
use runner::run::{self, PollOutcome, PollSchedule, VerifierRun};
use std::{path::Path, sync::Arc};

/// A handle to a running query.
///
/// The query is written to a [`QueryArtifact`] that lives as long as the
/// handle. Dropping the handle kills the verifier if it is still running and
/// then removes the query file.
#[derive(Debug)]
pub struct VerifierHandle {
    // fields drop in order: the run is cancelled before its query file is
    // removed
    run: VerifierRun<Result<Outcome, BackendError>>,
    artifact: QueryArtifact,
    query: String,
}

impl VerifierHandle {
    /// Write `query` next to `model` and start executing it. Returns
    /// immediately.
    pub fn start(
        backend: Arc<dyn Backend>,
        model: &Path,
        query: &str,
    ) -> Result<Self, BackendError> {
        let artifact = QueryArtifact::create(model, query, backend.query_extension())?;
        let model = model.to_path_buf();
        let query_path = artifact.path().to_path_buf();
        let run = VerifierRun::start(move |pid| backend.execute(&model, &query_path, pid));
        Ok(Self {
            run,
            artifact,
            query: query.to_string(),
        })
    }

    /// The query being executed.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Path of the query file.
    pub fn query_path(&self) -> &Path {
        self.artifact.path()
    }

    #[allow(missing_docs)]
    pub fn is_done(&self) -> bool {
        self.run.is_done()
    }

    #[allow(missing_docs)]
    pub fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }

    /// Cancel the query; see [`VerifierRun::cancel`].
    pub fn cancel(&self, hard: bool) {
        self.run.cancel(hard)
    }

    /// Poll until the query completes, the schedule's budget runs out or
    /// `interrupted` returns true.
    pub fn poll<F: Fn() -> bool>(&self, schedule: &PollSchedule, interrupted: F) -> PollOutcome {
        run::poll(&self.run, schedule, interrupted)
    }

    /// The backend's answer, once the query completed.
    pub fn result(&self) -> Option<Result<Outcome, BackendError>> {
        self.run.take_result()
    }
}
