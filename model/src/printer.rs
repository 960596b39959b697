// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Backend-neutral pretty printer for properties.
//!
//! This notation is only used for logging and for labelling results; backends
//! have their own serializers.

use crate::syntax::*;
use std::fmt;

fn predicate(p: &Predicate) -> String {
    match p {
        Predicate::Literal(b) => format!("{b}"),
        Predicate::InState(s) => format!("{}.{}", s.region, s.state),
        Predicate::Compare { var, op, value } => format!("{var} {} {value}", compare_op(*op)),
        Predicate::Raised(signal) => format!("raised({signal})"),
    }
}

/// Print a comparison operator in C-like syntax.
pub fn compare_op(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "==",
        CompareOp::Ne => "!=",
        CompareOp::Lt => "<",
        CompareOp::Le => "<=",
        CompareOp::Gt => ">",
        CompareOp::Ge => ">=",
    }
}

fn quantified(quantifier: PathQuantifier, op: TemporalOp) -> &'static str {
    match (quantifier, op) {
        (PathQuantifier::All, TemporalOp::Globally) => "AG",
        (PathQuantifier::All, TemporalOp::Finally) => "AF",
        (PathQuantifier::Exists, TemporalOp::Globally) => "EG",
        (PathQuantifier::Exists, TemporalOp::Finally) => "EF",
    }
}

/// Whether the printed form of `f` needs parentheses when nested.
fn is_compound(f: &StateFormula) -> bool {
    matches!(
        f,
        StateFormula::NAryOp(..) | StateFormula::Implies(..) | StateFormula::LeadsTo(..)
    ) || matches!(f, StateFormula::Atom(Predicate::Compare { .. }))
}

fn nested(f: &StateFormula) -> String {
    if is_compound(f) {
        format!("({})", formula(f))
    } else {
        formula(f)
    }
}

/// Print a formula in a compact CTL-like notation.
pub fn formula(f: &StateFormula) -> String {
    match f {
        StateFormula::Atom(p) => predicate(p),
        StateFormula::Not(body) => format!("!{}", nested(body)),
        StateFormula::NAryOp(op, ts) => {
            let sep = match op {
                NOp::And => " & ",
                NOp::Or => " | ",
            };
            ts.iter().map(nested).collect::<Vec<_>>().join(sep)
        }
        StateFormula::Implies(lhs, rhs) => format!("{} -> {}", nested(lhs), nested(rhs)),
        StateFormula::Quantified {
            quantifier,
            op,
            body,
        } => format!("{} {}", quantified(*quantifier, *op), nested(body)),
        StateFormula::LeadsTo(lhs, rhs) => format!("{} ~> {}", nested(lhs), nested(rhs)),
        StateFormula::Deadlock => "deadlock".to_string(),
    }
}

impl fmt::Display for StateFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", formula(self))
    }
}
