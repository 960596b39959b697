// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Decide properties from a trace, without running the verifier.
//!
//! A trace returned by the verifier is a real path of the model, so every
//! state it visits is reachable. That is enough to decide some properties:
//! `E F p` holds if some step satisfies `p`, and `A G p` fails if some step
//! violates `p`. Everything else is left undecided. The reduction is sound but
//! not complete; a property is only reported as covered when the trace
//! determines its value.
//!
//! Properties name the ports of the original component. The outputs of a
//! trace recorded on a derived component are on renamed ports, so they are
//! treated as unreported there.

use crate::worklist::WorkItem;
use model::{
    result::ThreeStateBoolean,
    semantics::{kleene_and, kleene_or},
    syntax::{NOp, PathQuantifier, StateFormula, TemporalOp},
    trace::{ExecutionTrace, Step},
};
use std::collections::BTreeMap;

fn eval(trace: &ExecutionTrace, step: &Step, f: &StateFormula) -> Option<bool> {
    if trace.component.is_derived() && step.outputs.is_some() {
        let unreported = Step {
            outputs: None,
            ..step.clone()
        };
        return unreported.eval(f);
    }
    step.eval(f)
}

/// The value of a property as determined by a trace, if the trace determines
/// it.
pub fn decide(trace: &ExecutionTrace, f: &StateFormula) -> Option<bool> {
    match f {
        StateFormula::Quantified {
            quantifier: PathQuantifier::Exists,
            op: TemporalOp::Finally,
            body,
        } if !body.is_temporal() => trace
            .steps
            .iter()
            .any(|s| eval(trace, s, body) == Some(true))
            .then_some(true),
        StateFormula::Quantified {
            quantifier: PathQuantifier::All,
            op: TemporalOp::Globally,
            body,
        } if !body.is_temporal() => trace
            .steps
            .iter()
            .any(|s| eval(trace, s, body) == Some(false))
            .then_some(false),
        StateFormula::Not(body) => decide(trace, body).map(|b| !b),
        StateFormula::NAryOp(NOp::And, ts) => kleene_and(ts.iter().map(|t| decide(trace, t))),
        StateFormula::NAryOp(NOp::Or, ts) => kleene_or(ts.iter().map(|t| decide(trace, t))),
        StateFormula::Implies(lhs, rhs) => {
            kleene_or([decide(trace, lhs).map(|b| !b), decide(trace, rhs)])
        }
        _ => None,
    }
}

/// The remaining properties that `trace` decides, with their values, keyed by
/// work item id.
pub fn covered<'a, I>(trace: &ExecutionTrace, remaining: I) -> BTreeMap<usize, ThreeStateBoolean>
where
    I: IntoIterator<Item = &'a WorkItem>,
{
    if trace.is_empty() {
        return BTreeMap::new();
    }
    remaining
        .into_iter()
        .filter_map(|item| decide(trace, &item.formula).map(|b| (item.id, b.into())))
        .collect()
}
