// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Map traces recorded on a derived component back onto its original.
//!
//! Every port, region and variable of a derived component records the element
//! of the original it came from. Back-annotation renames the elements a trace
//! mentions accordingly; events and states keep their names and must exist in
//! the corresponding original element. Step order and delays are preserved.

use crate::{
    conf::MappingPolicy,
    error::{ElementKind, MappingError},
};
use model::{
    component::{Component, Element},
    syntax::Signal,
    trace::{ExecutionTrace, Step},
};
use std::{collections::BTreeSet, sync::Arc};

/// A back-annotated trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// The trace, over the original component
    pub trace: ExecutionTrace,
    /// Identifiers dropped from the trace because they could not be mapped
    pub dropped: Vec<MappingError>,
}

/// Rewrites traces onto original components.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackAnnotator {
    policy: MappingPolicy,
}

struct Mapper<'a> {
    derived: &'a Component,
    original: &'a Component,
}

type Lookup = for<'c> fn(&'c Component, &str) -> Option<&'c Element>;

impl Mapper<'_> {
    /// Map the name of an element to the name of its origin, checking that
    /// `member` (an event or state) exists in both.
    fn element(
        &self,
        kind: ElementKind,
        lookup: Lookup,
        name: &str,
        member: Option<(ElementKind, &str)>,
    ) -> Result<String, MappingError> {
        let derived = self.derived.name().to_string();
        let Some(element) = lookup(self.derived, name) else {
            return Err(MappingError::Unknown {
                component: derived,
                kind,
                name: name.to_string(),
            });
        };
        let Some(origin) = &element.origin else {
            return Err(MappingError::Auxiliary {
                component: derived,
                kind,
                name: name.to_string(),
            });
        };
        let Some(original) = lookup(self.original, origin) else {
            return Err(MappingError::Missing {
                original: self.original.name().to_string(),
                kind,
                name: origin.clone(),
            });
        };
        if let Some((member_kind, member)) = member {
            if !element.members.contains(member) {
                return Err(MappingError::Unknown {
                    component: derived,
                    kind: member_kind,
                    name: format!("{name}.{member}"),
                });
            }
            if !original.members.contains(member) {
                return Err(MappingError::Missing {
                    original: self.original.name().to_string(),
                    kind: member_kind,
                    name: format!("{origin}.{member}"),
                });
            }
        }
        Ok(origin.clone())
    }

    fn signal(&self, signal: &Signal) -> Result<Signal, MappingError> {
        let port = self.element(
            ElementKind::Port,
            Component::port,
            &signal.port,
            Some((ElementKind::Event, signal.event.as_str())),
        )?;
        Ok(Signal::new(&port, &signal.event))
    }
}

impl BackAnnotator {
    #[allow(missing_docs)]
    pub fn new(policy: MappingPolicy) -> Self {
        Self { policy }
    }

    /// Record a mapping failure: fail in strict mode, otherwise log it and
    /// keep going without the offending identifier.
    fn handle(&self, err: MappingError, dropped: &mut Vec<MappingError>) -> Result<(), MappingError> {
        match self.policy {
            MappingPolicy::Strict => Err(err),
            MappingPolicy::Lenient => {
                log::warn!("dropping from trace: {err}");
                dropped.push(err);
                Ok(())
            }
        }
    }

    fn step(
        &self,
        mapper: &Mapper,
        step: &Step,
        dropped: &mut Vec<MappingError>,
    ) -> Result<Step, MappingError> {
        let mut mapped = Step::new().after(step.delay);
        for signal in &step.inputs {
            match mapper.signal(signal) {
                Ok(s) => mapped.inputs.push(s),
                Err(err) => self.handle(err, dropped)?,
            }
        }
        if let Some(outputs) = &step.outputs {
            let mut raised = BTreeSet::new();
            let mut complete = true;
            for signal in outputs {
                match mapper.signal(signal) {
                    Ok(s) => {
                        raised.insert(s);
                    }
                    Err(err) => {
                        self.handle(err, dropped)?;
                        complete = false;
                    }
                }
            }
            // a partial list would claim the dropped events were not raised
            mapped.outputs = complete.then_some(raised);
        }
        for (region, state) in &step.configuration {
            let r = mapper.element(
                ElementKind::Region,
                Component::region,
                region,
                Some((ElementKind::State, state.as_str())),
            );
            match r {
                Ok(region) => {
                    mapped.configuration.insert(region, state.clone());
                }
                Err(err) => self.handle(err, dropped)?,
            }
        }
        for (var, value) in &step.variables {
            match mapper.element(ElementKind::Variable, Component::variable, var, None) {
                Ok(var) => {
                    mapped.variables.insert(var, *value);
                }
                Err(err) => self.handle(err, dropped)?,
            }
        }
        Ok(mapped)
    }

    /// Rewrite `trace` onto the original of its component. Traces recorded on
    /// a component that is not derived are returned unchanged.
    ///
    /// In strict mode the first unmappable identifier is an error. In lenient
    /// mode unmappable identifiers are dropped from their step and reported
    /// in [`Annotation::dropped`].
    pub fn annotate(&self, trace: &ExecutionTrace) -> Result<Annotation, MappingError> {
        if !trace.component.is_derived() {
            return Ok(Annotation {
                trace: trace.clone(),
                dropped: vec![],
            });
        }
        let original: Arc<Component> = trace
            .component
            .original()
            .ok_or_else(|| MappingError::OriginalUnavailable(trace.component.name().to_string()))?;
        let mapper = Mapper {
            derived: &trace.component,
            original: &original,
        };
        let mut dropped = vec![];
        let steps = trace
            .steps
            .iter()
            .map(|step| self.step(&mapper, step, &mut dropped))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Annotation {
            trace: ExecutionTrace::new(original.clone(), steps),
            dropped,
        })
    }
}
