// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The queue of properties still to be checked in a run.

use model::syntax::{PropertyPackage, StateFormula};
use std::collections::{BTreeSet, VecDeque};

/// A property waiting to be checked.
///
/// The id identifies the entry within its run; two entries may hold the same
/// formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    #[allow(missing_docs)]
    pub id: usize,
    /// Comment of the property in its package
    pub comment: Option<String>,
    #[allow(missing_docs)]
    pub formula: StateFormula,
}

/// A FIFO of properties. Entries are only ever removed.
#[derive(Debug, Clone, Default)]
pub struct Worklist {
    items: VecDeque<WorkItem>,
}

impl Worklist {
    /// All properties of all packages, in package order and then in order
    /// within each package.
    pub fn from_packages(packages: &[PropertyPackage]) -> Self {
        let items = packages
            .iter()
            .flat_map(|p| p.formulas.iter())
            .enumerate()
            .map(|(id, f)| WorkItem {
                id,
                comment: f.comment.clone(),
                formula: f.formula.clone(),
            })
            .collect();
        Self { items }
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Take the next property.
    pub fn pop_front(&mut self) -> Option<WorkItem> {
        self.items.pop_front()
    }

    /// The remaining properties, in order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.iter()
    }

    /// Take all remaining properties.
    pub fn drain(&mut self) -> Vec<WorkItem> {
        self.items.drain(..).collect()
    }

    /// Remove the entries with the given ids, returning them in order. Ids no
    /// longer in the list are ignored.
    pub fn remove_ids(&mut self, ids: &BTreeSet<usize>) -> Vec<WorkItem> {
        let (removed, kept) = self
            .items
            .drain(..)
            .partition(|item| ids.contains(&item.id));
        self.items = kept;
        removed.into()
    }
}
