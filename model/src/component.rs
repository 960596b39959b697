// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Components identify the models that queries run against.
//!
//! A component is either an original model or a transformed (unfolded)
//! variant derived from one. A derived component keeps a weak link to its
//! original and records, for each of its ports, regions and variables, the
//! name of the element it was derived from. Elements introduced by the
//! transformation have no origin and are called auxiliary.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Weak};
use thiserror::Error;

/// A port, region or variable of a component.
#[derive(PartialEq, Eq, Clone, Debug, Default, Serialize, Deserialize)]
pub struct Element {
    /// Events of a port or states of a region (empty for variables)
    #[serde(default)]
    pub members: BTreeSet<String>,
    /// Name of the corresponding element of the original component
    #[serde(default)]
    pub origin: Option<String>,
}

impl Element {
    fn new<I, S>(members: I, origin: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            members: members
                .into_iter()
                .map(|s| s.as_ref().to_string())
                .collect(),
            origin: origin.map(|s| s.to_string()),
        }
    }
}

/// The serialized description of a component, as found in component files.
#[derive(PartialEq, Eq, Clone, Debug, Default, Serialize, Deserialize)]
pub struct ComponentDescription {
    /// Unique name of the component
    pub name: String,
    /// Name of the original component, for derived components
    #[serde(default)]
    pub derived_from: Option<String>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub ports: BTreeMap<String, Element>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub regions: BTreeMap<String, Element>,
    #[allow(missing_docs)]
    #[serde(default)]
    pub variables: BTreeMap<String, Element>,
}

/// A model that traces are recorded against.
#[derive(Debug)]
pub struct Component {
    description: ComponentDescription,
    original: Option<Weak<Component>>,
}

/// Errors from building or loading components.
#[derive(Error, Debug)]
pub enum ComponentError {
    /// A trace or component refers to a component that is not registered
    #[error("unknown component {0}")]
    Unknown(String),
    /// A derived component names an original that was not registered before it
    #[error("component {component} is derived from unknown component {original}")]
    UnknownOriginal {
        #[allow(missing_docs)]
        component: String,
        #[allow(missing_docs)]
        original: String,
    },
    /// Two components share a name
    #[error("duplicate component {0}")]
    Duplicate(String),
    /// The component file is malformed
    #[error("could not parse components: {0}")]
    Parse(#[from] serde_json::Error),
    /// The component file could not be read
    #[error("could not read components: {0}")]
    Io(#[from] std::io::Error),
}

impl Component {
    /// A component with a name and no declared elements, used when no
    /// component descriptions are available.
    pub fn opaque(name: &str) -> Arc<Self> {
        Arc::new(Self {
            description: ComponentDescription {
                name: name.to_string(),
                ..Default::default()
            },
            original: None,
        })
    }

    /// Name of the component
    pub fn name(&self) -> &str {
        &self.description.name
    }

    /// Description of the component's elements
    pub fn description(&self) -> &ComponentDescription {
        &self.description
    }

    /// Whether this component was derived from another one.
    pub fn is_derived(&self) -> bool {
        self.original.is_some()
    }

    /// The original component this one was derived from, if it is derived and
    /// the original is still alive.
    pub fn original(&self) -> Option<Arc<Component>> {
        self.original.as_ref().and_then(|w| w.upgrade())
    }

    #[allow(missing_docs)]
    pub fn port(&self, name: &str) -> Option<&Element> {
        self.description.ports.get(name)
    }

    #[allow(missing_docs)]
    pub fn region(&self, name: &str) -> Option<&Element> {
        self.description.regions.get(name)
    }

    #[allow(missing_docs)]
    pub fn variable(&self, name: &str) -> Option<&Element> {
        self.description.variables.get(name)
    }
}

/// Builder for creating a [`Component`].
#[derive(Debug, Clone)]
pub struct ComponentBuilder {
    description: ComponentDescription,
    original: Option<Weak<Component>>,
}

impl ComponentBuilder {
    /// Start building a component called `name`.
    pub fn new(name: &str) -> Self {
        Self {
            description: ComponentDescription {
                name: name.to_string(),
                ..Default::default()
            },
            original: None,
        }
    }

    /// Mark the component as derived from `original`.
    pub fn derived_from(mut self, original: &Arc<Component>) -> Self {
        self.description.derived_from = Some(original.name().to_string());
        self.original = Some(Arc::downgrade(original));
        self
    }

    /// Add a port with its events.
    pub fn port<I, S>(self, name: &str, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.traced_port(name, events, None)
    }

    /// Add a port that corresponds to port `origin` of the original component.
    pub fn traced_port<I, S>(mut self, name: &str, events: I, origin: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.description
            .ports
            .insert(name.to_string(), Element::new(events, origin));
        self
    }

    /// Add a region with its states.
    pub fn region<I, S>(self, name: &str, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.traced_region(name, states, None)
    }

    /// Add a region that corresponds to region `origin` of the original
    /// component.
    pub fn traced_region<I, S>(mut self, name: &str, states: I, origin: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.description
            .regions
            .insert(name.to_string(), Element::new(states, origin));
        self
    }

    /// Add a variable.
    pub fn variable(self, name: &str) -> Self {
        self.traced_variable(name, None)
    }

    /// Add a variable that corresponds to variable `origin` of the original
    /// component.
    pub fn traced_variable(mut self, name: &str, origin: Option<&str>) -> Self {
        self.description
            .variables
            .insert(name.to_string(), Element::new(Vec::<String>::new(), origin));
        self
    }

    /// Finish the component.
    pub fn build(self) -> Arc<Component> {
        Arc::new(Component {
            description: self.description,
            original: self.original,
        })
    }
}

/// Owns every component of a run and resolves component names.
#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    components: BTreeMap<String, Arc<Component>>,
}

impl ComponentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component.
    pub fn insert(&mut self, component: Arc<Component>) -> Result<(), ComponentError> {
        let name = component.name().to_string();
        if self.components.contains_key(&name) {
            return Err(ComponentError::Duplicate(name));
        }
        self.components.insert(name, component);
        Ok(())
    }

    /// Register a component from its description. A derived component's
    /// original must already be registered.
    pub fn insert_description(
        &mut self,
        description: ComponentDescription,
    ) -> Result<Arc<Component>, ComponentError> {
        let original = match &description.derived_from {
            Some(original) => match self.components.get(original) {
                Some(c) => Some(Arc::downgrade(c)),
                None => {
                    return Err(ComponentError::UnknownOriginal {
                        component: description.name.clone(),
                        original: original.clone(),
                    })
                }
            },
            None => None,
        };
        let component = Arc::new(Component {
            description,
            original,
        });
        self.insert(component.clone())?;
        Ok(component)
    }

    /// Parse a JSON list of component descriptions. Originals must be listed
    /// before the components derived from them.
    pub fn from_json(json: &str) -> Result<Self, ComponentError> {
        let descriptions: Vec<ComponentDescription> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for description in descriptions {
            registry.insert_description(description)?;
        }
        Ok(registry)
    }

    /// Load a JSON component file.
    pub fn load(path: &Path) -> Result<Self, ComponentError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Look up a registered component.
    pub fn get(&self, name: &str) -> Option<Arc<Component>> {
        self.components.get(name).cloned()
    }

    /// Whether no components are registered.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Resolve the component a trace was recorded against. With an empty
    /// registry every name resolves to an opaque component.
    pub fn resolve(&self, name: &str) -> Result<Arc<Component>, ComponentError> {
        if self.is_empty() {
            return Ok(Component::opaque(name));
        }
        self.get(name)
            .ok_or_else(|| ComponentError::Unknown(name.to_string()))
    }
}
