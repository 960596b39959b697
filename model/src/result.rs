// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Three-valued verification results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The answer of a verifier for one query.
///
/// `Undef` is reserved for queries that did not run to completion (timeout,
/// cancellation or a backend failure).
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, Serialize, Deserialize)]
pub enum ThreeStateBoolean {
    /// The property holds
    #[serde(rename = "TRUE")]
    True,
    /// The property does not hold
    #[serde(rename = "FALSE")]
    False,
    /// The verifier did not decide the property
    #[serde(rename = "UNDEF")]
    Undef,
}

impl ThreeStateBoolean {
    /// Whether this is a decided answer.
    pub fn is_decided(&self) -> bool {
        !matches!(self, ThreeStateBoolean::Undef)
    }

    /// Negate a result, leaving `Undef` unchanged.
    pub fn negate(self) -> Self {
        match self {
            ThreeStateBoolean::True => ThreeStateBoolean::False,
            ThreeStateBoolean::False => ThreeStateBoolean::True,
            ThreeStateBoolean::Undef => ThreeStateBoolean::Undef,
        }
    }
}

impl From<bool> for ThreeStateBoolean {
    fn from(value: bool) -> Self {
        if value {
            ThreeStateBoolean::True
        } else {
            ThreeStateBoolean::False
        }
    }
}

impl From<Option<bool>> for ThreeStateBoolean {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(b) => b.into(),
            None => ThreeStateBoolean::Undef,
        }
    }
}

impl fmt::Display for ThreeStateBoolean {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreeStateBoolean::True => "TRUE",
            ThreeStateBoolean::False => "FALSE",
            ThreeStateBoolean::Undef => "UNDEF",
        };
        write!(f, "{s}")
    }
}
