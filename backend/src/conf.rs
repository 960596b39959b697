// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Holds the configuration needed to select the backend of a run.

use crate::{
    backends::{BackendType, CommandBackend},
    imp::{Backend, BackendError},
};
use itertools::Itertools;
use model::component::ComponentRegistry;
use runner::conf::VerifierCmd;
use std::sync::Arc;

/// Wrapper around the configuration needed to select a backend.
#[derive(Debug, Clone, Default)]
pub struct BackendConf {
    /// The analysis languages selected for the run. Exactly one distinct
    /// language must be selected.
    pub languages: Vec<BackendType>,
    /// Adapter invocation, replacing the language's default adapter
    pub adapter: Option<VerifierCmd>,
    /// Components that traces may refer to
    pub registry: ComponentRegistry,
}

impl BackendConf {
    /// Configuration for a single analysis language.
    pub fn new(backend_type: BackendType) -> Self {
        Self {
            languages: vec![backend_type],
            ..Default::default()
        }
    }

    /// The analysis language of the run.
    pub fn backend_type(&self) -> Result<BackendType, BackendError> {
        let languages = self.languages.iter().copied().unique().collect_vec();
        match languages[..] {
            [backend_type] => Ok(backend_type),
            [] => Err(BackendError::Config(
                "no analysis language selected".to_string(),
            )),
            _ => Err(BackendError::Config(format!(
                "exactly one analysis language must be selected, got {}",
                languages.iter().join(", ")
            ))),
        }
    }

    /// Build the backend of the run.
    pub fn backend(&self) -> Result<Arc<dyn Backend>, BackendError> {
        let backend_type = self.backend_type()?;
        let cmd = match &self.adapter {
            Some(cmd) => cmd.clone(),
            None => backend_type.default_cmd(),
        };
        Ok(Arc::new(CommandBackend::new(
            backend_type,
            cmd,
            self.registry.clone(),
        )))
    }
}
