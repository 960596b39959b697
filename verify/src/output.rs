// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Write the results and traces of a run to a folder.

use crate::report::{ResultArtifact, RunReport};
use model::{
    component::ComponentRegistry,
    trace::{ExecutionTrace, TraceArtifact},
};
use serde::Serialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Writes trace and result artifacts with numbered file names.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
    base_name: String,
}

const TRACE_SUFFIX: &str = ".json";
const RESULT_SUFFIX: &str = ".result.json";

fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json + "\n")
}

impl ArtifactWriter {
    /// A writer into `dir`, naming files `ExecutionTrace<n>`.
    pub fn new(dir: &Path) -> Self {
        Self::with_base_name(dir, "ExecutionTrace")
    }

    #[allow(missing_docs)]
    pub fn with_base_name(dir: &Path, base_name: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            base_name: base_name.to_string(),
        }
    }

    /// The first path `<base><n><suffix>` that does not exist yet.
    fn next_path(&self, suffix: &str) -> PathBuf {
        let mut id = 0;
        loop {
            let path = self.dir.join(format!("{}{id}{suffix}", self.base_name));
            if !path.exists() {
                return path;
            }
            id += 1;
        }
    }

    /// Write one trace.
    pub fn write_trace(&self, trace: &ExecutionTrace) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.next_path(TRACE_SUFFIX);
        write_json(&path, &TraceArtifact::from_trace(trace))?;
        Ok(path)
    }

    /// Write one result.
    pub fn write_result(&self, result: &ResultArtifact) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.next_path(RESULT_SUFFIX);
        write_json(&path, result)?;
        Ok(path)
    }

    /// Write every result and trace of a report. Returns the written paths.
    pub fn write_report(&self, report: &RunReport) -> io::Result<Vec<PathBuf>> {
        let mut paths = vec![];
        for record in &report.results {
            paths.push(self.write_result(&record.artifact())?);
        }
        for trace in &report.traces {
            paths.push(self.write_trace(trace)?);
        }
        Ok(paths)
    }
}

/// Load a trace artifact, resolving its component in `registry`.
pub fn read_trace(path: &Path, registry: &ComponentRegistry) -> io::Result<ExecutionTrace> {
    let json = fs::read_to_string(path)?;
    let artifact: TraceArtifact = serde_json::from_str(&json)?;
    artifact
        .resolve(registry)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}
