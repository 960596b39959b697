// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Contains error types for verification runs.

use backend::imp::BackendError;
use serde::Serialize;
use std::{fmt, io, path::PathBuf};
use thiserror::Error;

/// Errors that abort a whole run.
///
/// Failures of individual queries never abort a run; they are recorded in the
/// report as a [`QueryFailure`].
#[derive(Error, Debug)]
pub enum RunError {
    /// The selected backend cannot be started
    #[error("{0}")]
    BackendUnavailable(String),
    /// The run is misconfigured
    #[error("invalid configuration: {0}")]
    Config(String),
    /// A raw query file could not be read
    #[error("could not read query file {}: {err}", path.display())]
    QueryFile {
        #[allow(missing_docs)]
        path: PathBuf,
        #[allow(missing_docs)]
        #[source]
        err: io::Error,
    },
}

impl From<BackendError> for RunError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Config(msg) => RunError::Config(msg),
            BackendError::Unavailable(msg) => {
                RunError::BackendUnavailable(format!("verification backend is unavailable: {msg}"))
            }
            err => RunError::BackendUnavailable(err.to_string()),
        }
    }
}

/// Why a query ended without a decided result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum QueryFailure {
    /// The query did not complete within the timeout
    Timeout,
    /// The backend reported a malformed query or an internal failure
    Execution(String),
    /// The property cannot be expressed in the backend's query language, so
    /// it was not dispatched
    Unsupported(String),
    /// The run was cancelled while the query was in flight
    Cancelled,
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFailure::Timeout => write!(f, "timed out"),
            QueryFailure::Execution(msg) => write!(f, "execution failed: {msg}"),
            QueryFailure::Unsupported(msg) => write!(f, "unsupported: {msg}"),
            QueryFailure::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Kinds of component elements, for mapping errors.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ElementKind {
    Port,
    Event,
    Region,
    State,
    Variable,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementKind::Port => "port",
            ElementKind::Event => "event",
            ElementKind::Region => "region",
            ElementKind::State => "state",
            ElementKind::Variable => "variable",
        };
        write!(f, "{s}")
    }
}

/// An identifier of a trace that cannot be mapped onto the original component.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MappingError {
    /// The trace mentions an element its own component does not declare
    #[error("{kind} {name} is not declared by component {component}")]
    Unknown {
        #[allow(missing_docs)]
        component: String,
        #[allow(missing_docs)]
        kind: ElementKind,
        #[allow(missing_docs)]
        name: String,
    },
    /// The element was introduced by the transformation
    #[error("{kind} {name} of component {component} is auxiliary")]
    Auxiliary {
        #[allow(missing_docs)]
        component: String,
        #[allow(missing_docs)]
        kind: ElementKind,
        #[allow(missing_docs)]
        name: String,
    },
    /// The element's recorded origin does not exist in the original component
    #[error("{kind} {name} has no counterpart in component {original}")]
    Missing {
        #[allow(missing_docs)]
        original: String,
        #[allow(missing_docs)]
        kind: ElementKind,
        #[allow(missing_docs)]
        name: String,
    },
    /// The original component is no longer available
    #[error("the original of component {0} is not available")]
    OriginalUnavailable(String),
}
