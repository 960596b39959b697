// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Remove traces and steps that witness nothing new.
//!
//! A trace covers another if both were recorded on the same component and
//! every step of the other one is observed by a single step of it, with the
//! same active states, variable values and reported outputs. Comparing whole
//! steps keeps the states a trace reaches: a state where `main` is `A` and
//! `count` is 1 is not witnessed by one step in `A` and another with `count`
//! at 1.

use model::trace::ExecutionTrace;

/// Whether every step of `trace` is within some step of `by`.
pub fn is_covered(trace: &ExecutionTrace, by: &ExecutionTrace) -> bool {
    trace.component.name() == by.component.name()
        && trace.steps.iter().all(|step| by.reaches(step))
}

/// Whether some trace of `others` covers `trace`.
pub fn is_covered_by_any<'a, I>(trace: &ExecutionTrace, others: I) -> bool
where
    I: IntoIterator<Item = &'a ExecutionTrace>,
{
    others.into_iter().any(|other| is_covered(trace, other))
}

/// Keep the traces that are not covered by a trace kept before them.
fn sweep<I>(traces: I) -> Vec<ExecutionTrace>
where
    I: IntoIterator<Item = ExecutionTrace>,
{
    let mut kept: Vec<ExecutionTrace> = vec![];
    for trace in traces {
        if !is_covered_by_any(&trace, &kept) {
            kept.push(trace);
        }
    }
    kept
}

/// Remove covered traces, in a forward and then a backward pass.
///
/// The forward pass drops traces covered by an earlier trace, the backward pass
/// drops traces covered by a later one. No remaining trace covers another, and
/// every step of the input is still within a step of some remaining trace.
pub fn remove_covered_traces(traces: Vec<ExecutionTrace>) -> Vec<ExecutionTrace> {
    let forward = sweep(traces);
    let mut backward = sweep(forward.into_iter().rev());
    backward.reverse();
    backward
}

/// Drop trailing steps that observe nothing, or nothing beyond a single
/// earlier step of the trace.
pub fn remove_covered_steps(mut trace: ExecutionTrace) -> ExecutionTrace {
    while let Some((last, earlier)) = trace.steps.split_last() {
        if last.is_unobserved() || earlier.iter().any(|s| last.is_within(s)) {
            trace.steps.pop();
        } else {
            break;
        }
    }
    trace
}
