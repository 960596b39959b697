// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Evaluate state predicates on the steps of a trace.
//!
//! Steps only carry partial observations (a region or variable may be absent),
//! so evaluation is three-valued: `None` means the step does not determine the
//! value. Temporal operators and deadlock cannot be evaluated on a single step
//! and always evaluate to `None`.

use crate::syntax::*;
use crate::trace::Step;
use std::cmp::Ordering;

fn compare(lhs: &Value, op: CompareOp, rhs: &Value) -> Option<bool> {
    let ord = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => match op {
            CompareOp::Eq => return Some(a == b),
            CompareOp::Ne => return Some(a != b),
            _ => return None,
        },
        _ => return None,
    };
    let holds = match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Ne => ord != Ordering::Equal,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Ge => ord != Ordering::Less,
    };
    Some(holds)
}

/// Kleene conjunction: false dominates, otherwise unknown dominates.
pub fn kleene_and<I: IntoIterator<Item = Option<bool>>>(values: I) -> Option<bool> {
    let mut result = Some(true);
    for v in values {
        match v {
            Some(false) => return Some(false),
            None => result = None,
            Some(true) => (),
        }
    }
    result
}

/// Kleene disjunction: true dominates, otherwise unknown dominates.
pub fn kleene_or<I: IntoIterator<Item = Option<bool>>>(values: I) -> Option<bool> {
    kleene_and(values.into_iter().map(|v| v.map(|b| !b))).map(|b| !b)
}

impl Step {
    /// Evaluate an atomic predicate in this step.
    pub fn eval_predicate(&self, p: &Predicate) -> Option<bool> {
        match p {
            Predicate::Literal(b) => Some(*b),
            Predicate::InState(s) => self.configuration.get(&s.region).map(|a| a == &s.state),
            Predicate::Compare { var, op, value } => self
                .variables
                .get(var)
                .and_then(|v| compare(v, *op, value)),
            // reported outputs list every raised event
            Predicate::Raised(signal) => self.outputs.as_ref().map(|o| o.contains(signal)),
        }
    }

    /// Evaluate a state formula in this step.
    pub fn eval(&self, f: &StateFormula) -> Option<bool> {
        match f {
            StateFormula::Atom(p) => self.eval_predicate(p),
            StateFormula::Not(body) => self.eval(body).map(|b| !b),
            StateFormula::NAryOp(NOp::And, ts) => kleene_and(ts.iter().map(|t| self.eval(t))),
            StateFormula::NAryOp(NOp::Or, ts) => kleene_or(ts.iter().map(|t| self.eval(t))),
            StateFormula::Implies(lhs, rhs) => {
                kleene_or([self.eval(lhs).map(|b| !b), self.eval(rhs)])
            }
            StateFormula::Quantified { .. } | StateFormula::LeadsTo(..) | StateFormula::Deadlock => {
                None
            }
        }
    }
}
