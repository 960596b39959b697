// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Support for launching a verifier adapter (for UPPAAL, Theta or
//! XSTS-UPPAAL) and then parsing its answer.
//!
//! An adapter is an executable that takes a model and a query file, runs the
//! actual verifier and prints a single JSON document on stdout:
//!
//! ```json
//! {"result": "TRUE", "trace": {"component": "Controller", "steps": [...]}}
//! ```
//!
//! `result` is one of `TRUE`, `FALSE` and `UNDEF`, and `trace` is optional. A
//! non-zero exit status means the query failed; the adapter's stderr is
//! reported as the reason.

use crate::{
    imp::{Backend, BackendError, Outcome},
    serialize::{PropertySerializer, ThetaSerializer, UppaalSerializer, XstsUppaalSerializer},
};
use model::{
    component::ComponentRegistry, result::ThreeStateBoolean, syntax::StateFormula,
    trace::TraceArtifact,
};
use runner::{conf::VerifierCmd, path, proc::ProcPid};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};

/// The analysis language (and verifier) used for a run
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackendType {
    Uppaal,
    Theta,
    XstsUppaal,
}

impl BackendType {
    /// The serializer for this backend's query language.
    pub fn serializer(&self) -> &'static dyn PropertySerializer {
        match self {
            BackendType::Uppaal => &UppaalSerializer,
            BackendType::Theta => &ThetaSerializer,
            BackendType::XstsUppaal => &XstsUppaalSerializer,
        }
    }

    /// Name of the adapter binary for this backend.
    pub fn adapter_bin(&self) -> &'static str {
        match self {
            BackendType::Uppaal => "uppaal-adapter",
            BackendType::Theta => "theta-adapter",
            BackendType::XstsUppaal => "xsts-uppaal-adapter",
        }
    }

    /// Extension of query files for this backend.
    pub fn query_extension(&self) -> &'static str {
        match self {
            BackendType::Uppaal | BackendType::XstsUppaal => "q",
            BackendType::Theta => "prop",
        }
    }

    /// The default adapter invocation, found with [`path::verifier_path`].
    pub fn default_cmd(&self) -> VerifierCmd {
        let mut cmd = VerifierCmd::new(&path::verifier_path(self.adapter_bin()));
        cmd.args(["{model}", "{query}"]);
        cmd
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendType::Uppaal => "UPPAAL",
            BackendType::Theta => "Theta",
            BackendType::XstsUppaal => "XSTS-UPPAAL",
        };
        write!(f, "{name}")
    }
}

/// The JSON document an adapter prints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterResponse {
    /// The verdict
    pub result: ThreeStateBoolean,
    /// A witness or counterexample
    #[serde(default)]
    pub trace: Option<TraceArtifact>,
}

/// A Backend that runs an adapter executable per query.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    backend_type: BackendType,
    name: String,
    cmd: VerifierCmd,
    registry: ComponentRegistry,
}

impl CommandBackend {
    /// Create a Backend for a given type of verifier, invoked with `cmd`.
    /// Traces are resolved against the components in `registry`.
    pub fn new(backend_type: BackendType, cmd: VerifierCmd, registry: ComponentRegistry) -> Self {
        Self {
            backend_type,
            name: backend_type.to_string(),
            cmd,
            registry,
        }
    }

    /// Get the backend type.
    pub fn get_backend_type(&self) -> BackendType {
        self.backend_type
    }

    fn parse_response(&self, stdout: &[u8]) -> Result<Outcome, BackendError> {
        let response: AdapterResponse = serde_json::from_slice(stdout)
            .map_err(|err| BackendError::Protocol(err.to_string()))?;
        let trace = match response.trace {
            Some(artifact) => Some(artifact.resolve(&self.registry)?),
            None => None,
        };
        Ok(Outcome {
            result: response.result,
            trace,
        })
    }
}

impl Backend for CommandBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn query_extension(&self) -> &str {
        self.backend_type.query_extension()
    }

    fn serialize(&self, formula: &StateFormula) -> Result<String, BackendError> {
        self.backend_type.serializer().serialize(formula)
    }

    fn health_check(&self) -> Result<(), BackendError> {
        match path::find_executable(&self.cmd.cmd) {
            Some(_) => Ok(()),
            None => Err(BackendError::Unavailable(format!(
                "could not find {} adapter {}",
                self.backend_type, self.cmd.cmd
            ))),
        }
    }

    fn execute(&self, model: &Path, query: &Path, pid: &ProcPid) -> Result<Outcome, BackendError> {
        let cmd = self.cmd.instantiate(model, query);
        log::debug!("running {}", cmd.cmdline());
        let output = pid.output(&mut cmd.command())?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let msg = if stderr.is_empty() {
                format!("{} exited with {}", self.cmd.cmd, output.status)
            } else {
                stderr
            };
            return Err(BackendError::QueryFailed(msg));
        }
        self.parse_response(&output.stdout)
    }
}
