// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The interface every verification backend implements.

use model::{
    component::ComponentError, result::ThreeStateBoolean, syntax::StateFormula,
    trace::ExecutionTrace,
};
use runner::proc::{ProcPid, RunnerError};
use std::{fmt, io, path::Path};
use thiserror::Error;

/// The answer of a backend for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The verdict
    pub result: ThreeStateBoolean,
    /// A witness or counterexample, if the backend produced one
    pub trace: Option<ExecutionTrace>,
}

impl Outcome {
    /// An outcome without a trace.
    pub fn verdict(result: ThreeStateBoolean) -> Self {
        Self {
            result,
            trace: None,
        }
    }
}

#[derive(Error, Debug)]
/// An error from a backend
pub enum BackendError {
    /// The backend cannot be started at all
    #[error("verification backend is unavailable: {0}")]
    Unavailable(String),
    /// The property cannot be expressed in the backend's query language
    #[error("{backend} cannot express {formula}: {reason}")]
    Unsupported {
        #[allow(missing_docs)]
        backend: String,
        /// The property, printed in neutral notation
        formula: String,
        #[allow(missing_docs)]
        reason: String,
    },
    /// The backend rejected the query or failed internally
    #[error("query failed:\n{0}")]
    QueryFailed(String),
    /// The backend's answer could not be understood
    #[error("could not parse the verifier output: {0}")]
    Protocol(String),
    /// The backend returned a trace over an unknown component
    #[error("{0}")]
    Component(#[from] ComponentError),
    /// The backend configuration is malformed
    #[error("invalid backend configuration: {0}")]
    Config(String),
    /// The verifier process was killed
    #[error("verifier was killed")]
    Killed,
    /// I/O went wrong
    #[error("some I/O went wrong: {0}")]
    Io(#[from] io::Error),
}

impl From<RunnerError> for BackendError {
    fn from(value: RunnerError) -> Self {
        match value {
            RunnerError::Io(err) => BackendError::Io(err),
            RunnerError::Killed => BackendError::Killed,
        }
    }
}

/// A verification backend.
///
/// Implementations must be shareable across threads: `execute` runs on the
/// background thread of a [`runner::run::VerifierRun`] while the controlling
/// thread keeps using the backend.
pub trait Backend: fmt::Debug + Send + Sync {
    /// A short name for the backend, used in messages.
    fn name(&self) -> &str;

    /// Extension of query files for this backend, without the dot.
    fn query_extension(&self) -> &str {
        "q"
    }

    /// Translate a property into the backend's query language.
    fn serialize(&self, formula: &StateFormula) -> Result<String, BackendError>;

    /// Check that the backend can be started.
    fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Run the queries in the file `query` against `model`.
    ///
    /// Every process must be spawned through `pid`, so that cancelling the
    /// invocation kills it.
    fn execute(&self, model: &Path, query: &Path, pid: &ProcPid) -> Result<Outcome, BackendError>;
}
