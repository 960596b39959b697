// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Construct launch configurations for verifier binaries.

use std::path::Path;
use std::process::Command;

/// Placeholder replaced by the model path when a command is instantiated.
pub const MODEL_PLACEHOLDER: &str = "{model}";
/// Placeholder replaced by the query file path when a command is instantiated.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// The full invocation of a verifier binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierCmd {
    /// Binary to launch
    pub cmd: String,
    /// Arguments to pass, possibly containing placeholders
    pub args: Vec<String>,
    /// Extra environment variables for the process
    pub env: Vec<(String, String)>,
}

impl VerifierCmd {
    /// A command with no arguments. Uses `cmd` as the path to the binary.
    pub fn new(cmd: &str) -> Self {
        Self {
            cmd: cmd.to_string(),
            args: vec![],
            env: vec![],
        }
    }

    /// Append arguments.
    pub fn args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
        self
    }

    /// Set an environment variable for the process.
    pub fn env<S: AsRef<str>>(&mut self, name: &str, val: S) -> &mut Self {
        self.env
            .push((name.to_string(), val.as_ref().to_string()));
        self
    }

    /// Substitute the model and query paths for their placeholders. If no
    /// argument mentions a placeholder the paths are appended in order.
    pub fn instantiate(&self, model: &Path, query: &Path) -> Self {
        let model = model.to_string_lossy();
        let query = query.to_string_lossy();
        let mentions = self
            .args
            .iter()
            .any(|a| a.contains(MODEL_PLACEHOLDER) || a.contains(QUERY_PLACEHOLDER));
        let mut cmd = self.clone();
        if mentions {
            cmd.args = self
                .args
                .iter()
                .map(|a| {
                    a.replace(MODEL_PLACEHOLDER, &model)
                        .replace(QUERY_PLACEHOLDER, &query)
                })
                .collect();
        } else {
            cmd.args([model, query]);
        }
        cmd
    }

    /// Build a [`Command`] for this invocation.
    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.cmd);
        command.args(&self.args);
        command.envs(self.env.iter().map(|(k, v)| (k, v)));
        command
    }

    /// Build the command line string, for printing purposes.
    pub fn cmdline(&self) -> String {
        #[allow(clippy::useless_format)]
        let args: Vec<_> = self
            .args
            .iter()
            .map(|a| {
                if a.contains(' ') {
                    format!("\"{a}\"")
                } else {
                    format!("{a}")
                }
            })
            .collect();
        format!("{} {}", &self.cmd, args.join(" "))
    }
}
