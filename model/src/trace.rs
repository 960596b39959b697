// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Execution traces returned by verifiers.

use crate::component::{Component, ComponentError, ComponentRegistry};
use crate::syntax::{Signal, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// One step of an execution trace: the stimuli applied to the component and
/// the observable state after the component reacted.
#[derive(PartialEq, Eq, Clone, Debug, Default, Hash, Serialize, Deserialize)]
pub struct Step {
    /// Time elapsed before the step
    #[serde(default)]
    pub delay: u64,
    /// Events raised on input ports
    #[serde(default)]
    pub inputs: Vec<Signal>,
    /// Events raised on output ports, if the verifier reported them. A step
    /// without outputs says nothing about which events were raised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<BTreeSet<Signal>>,
    /// Active state of each observed region
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
    /// Values of the observed variables
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

impl Step {
    /// A step with no stimuli and no observations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input event.
    pub fn input(mut self, port: &str, event: &str) -> Self {
        self.inputs.push(Signal::new(port, event));
        self
    }

    /// Add a raised output event.
    pub fn output(mut self, port: &str, event: &str) -> Self {
        self.outputs
            .get_or_insert_with(BTreeSet::new)
            .insert(Signal::new(port, event));
        self
    }

    /// Mark the outputs of this step as reported, so that events not added
    /// with [`Step::output`] are known not to be raised.
    pub fn silent(mut self) -> Self {
        self.outputs.get_or_insert_with(BTreeSet::new);
        self
    }

    /// Set the active state of a region.
    pub fn active(mut self, region: &str, state: &str) -> Self {
        self.configuration
            .insert(region.to_string(), state.to_string());
        self
    }

    /// Set the value of a variable.
    pub fn assign(mut self, var: &str, value: Value) -> Self {
        self.variables.insert(var.to_string(), value);
        self
    }

    /// Set the delay before this step.
    pub fn after(mut self, delay: u64) -> Self {
        self.delay = delay;
        self
    }

    /// Whether the step observes nothing: no region, no variable and no
    /// reported outputs. Inputs are stimuli, not observations.
    pub fn is_unobserved(&self) -> bool {
        self.configuration.is_empty() && self.variables.is_empty() && self.outputs.is_none()
    }

    /// Whether `other` observes everything this step observes, in the same
    /// state. Every predicate this step decides is then decided the same way
    /// by `other`. Reported outputs must match exactly, since they also
    /// determine which events were not raised.
    pub fn is_within(&self, other: &Step) -> bool {
        let active = self
            .configuration
            .iter()
            .all(|(region, state)| other.configuration.get(region) == Some(state));
        let assigned = self
            .variables
            .iter()
            .all(|(var, value)| other.variables.get(var) == Some(value));
        let raised = match &self.outputs {
            None => true,
            Some(outputs) => other.outputs.as_ref() == Some(outputs),
        };
        active && assigned && raised
    }
}

/// A path through a component, as a witness or counterexample for a query.
#[derive(Clone, Debug)]
pub struct ExecutionTrace {
    /// The component the trace was recorded against
    pub component: Arc<Component>,
    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl PartialEq for ExecutionTrace {
    fn eq(&self, other: &Self) -> bool {
        self.component.name() == other.component.name() && self.steps == other.steps
    }
}

impl Eq for ExecutionTrace {}

impl ExecutionTrace {
    #[allow(missing_docs)]
    pub fn new(component: Arc<Component>, steps: Vec<Step>) -> Self {
        Self { component, steps }
    }

    /// Whether the trace has no steps. Empty traces are never retained.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether some single step of the trace observes everything `step`
    /// observes.
    pub fn reaches(&self, step: &Step) -> bool {
        self.steps.iter().any(|s| step.is_within(s))
    }
}

/// A serializable form of an [`ExecutionTrace`], which names its component
/// instead of holding it.
#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub struct TraceArtifact {
    /// Name of the component the trace was recorded against
    pub component: String,
    #[allow(missing_docs)]
    pub steps: Vec<Step>,
}

impl TraceArtifact {
    #[allow(missing_docs)]
    pub fn from_trace(trace: &ExecutionTrace) -> Self {
        Self {
            component: trace.component.name().to_string(),
            steps: trace.steps.clone(),
        }
    }

    /// Turn the artifact back into a trace, resolving its component.
    pub fn resolve(self, registry: &ComponentRegistry) -> Result<ExecutionTrace, ComponentError> {
        let component = registry.resolve(&self.component)?;
        Ok(ExecutionTrace::new(component, self.steps))
    }
}
