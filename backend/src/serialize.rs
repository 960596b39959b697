// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Translate properties into the query languages of the supported verifiers.
//!
//! All supported query languages share the same shape: a single path
//! quantifier with a temporal operator at the root, over a state expression
//! with C-like connectives. They differ in how states, raised events and
//! implication are written and in which temporal shapes they accept.

use crate::imp::BackendError;
use model::{
    printer::compare_op,
    syntax::{NOp, PathQuantifier, Predicate, Signal, StateFormula, StateRef, TemporalOp},
};

/// Translates properties into one query language.
pub trait PropertySerializer {
    /// Produce the query for a property.
    fn serialize(&self, formula: &StateFormula) -> Result<String, BackendError>;
}

/// How a query language writes state expressions and which temporal shapes
/// it supports.
struct Dialect {
    name: &'static str,
    implies: &'static str,
    in_state: fn(&StateRef) -> String,
    leads_to: bool,
    deadlock: bool,
    all_shapes: bool,
}

fn raised_variable(signal: &Signal) -> String {
    format!("{}_{}_Out", signal.port, signal.event)
}

impl Dialect {
    fn unsupported(&self, formula: &StateFormula, reason: &str) -> BackendError {
        BackendError::Unsupported {
            backend: self.name.to_string(),
            formula: formula.to_string(),
            reason: reason.to_string(),
        }
    }

    fn predicate(&self, p: &Predicate) -> String {
        match p {
            Predicate::Literal(b) => format!("{b}"),
            Predicate::InState(s) => (self.in_state)(s),
            Predicate::Compare { var, op, value } => {
                format!("{var} {} {value}", compare_op(*op))
            }
            Predicate::Raised(signal) => raised_variable(signal),
        }
    }

    fn nested(&self, root: &StateFormula, f: &StateFormula) -> Result<String, BackendError> {
        let s = self.expr(root, f)?;
        let compound = matches!(
            f,
            StateFormula::NAryOp(..)
                | StateFormula::Implies(..)
                | StateFormula::Atom(Predicate::Compare { .. })
        ) || matches!(f, StateFormula::Atom(Predicate::InState(_)) if s.contains(' '));
        if compound {
            Ok(format!("({s})"))
        } else {
            Ok(s)
        }
    }

    /// A state expression, not containing temporal operators.
    fn expr(&self, root: &StateFormula, f: &StateFormula) -> Result<String, BackendError> {
        match f {
            StateFormula::Atom(p) => Ok(self.predicate(p)),
            StateFormula::Not(body) => Ok(format!("!{}", self.nested(root, body)?)),
            StateFormula::NAryOp(op, ts) => {
                let sep = match op {
                    NOp::And => " && ",
                    NOp::Or => " || ",
                };
                let ts = ts
                    .iter()
                    .map(|t| self.nested(root, t))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ts.join(sep))
            }
            StateFormula::Implies(lhs, rhs) => Ok(format!(
                "{} {} {}",
                self.nested(root, lhs)?,
                self.implies,
                self.nested(root, rhs)?
            )),
            StateFormula::Deadlock if self.deadlock => Ok("deadlock".to_string()),
            StateFormula::Deadlock => Err(self.unsupported(root, "deadlock is not supported")),
            StateFormula::Quantified { .. } | StateFormula::LeadsTo(..) => {
                Err(self.unsupported(root, "nested temporal operators are not supported"))
            }
        }
    }

    fn body(&self, root: &StateFormula, f: &StateFormula) -> Result<String, BackendError> {
        let s = self.expr(root, f)?;
        if matches!(f, StateFormula::NAryOp(..) | StateFormula::Implies(..)) {
            Ok(format!("({s})"))
        } else {
            Ok(s)
        }
    }

    fn query(&self, f: &StateFormula) -> Result<String, BackendError> {
        match f {
            StateFormula::Quantified {
                quantifier,
                op,
                body,
            } => {
                let op = match (quantifier, op) {
                    (PathQuantifier::Exists, TemporalOp::Finally) => "E<>",
                    (PathQuantifier::All, TemporalOp::Globally) => "A[]",
                    _ if !self.all_shapes => {
                        return Err(self.unsupported(
                            f,
                            "only E<> and A[] properties are supported",
                        ))
                    }
                    (PathQuantifier::All, TemporalOp::Finally) => "A<>",
                    (PathQuantifier::Exists, TemporalOp::Globally) => "E[]",
                };
                Ok(format!("{op} {}", self.body(f, body)?))
            }
            StateFormula::LeadsTo(lhs, rhs) if self.leads_to => Ok(format!(
                "{} --> {}",
                self.body(f, lhs)?,
                self.body(f, rhs)?
            )),
            StateFormula::LeadsTo(..) => {
                Err(self.unsupported(f, "leads-to properties are not supported"))
            }
            _ => Err(self.unsupported(f, "a query needs a temporal operator at its root")),
        }
    }
}

const UPPAAL: Dialect = Dialect {
    name: "UPPAAL",
    implies: "imply",
    in_state: |s| format!("{}.{}", s.region, s.state),
    leads_to: true,
    deadlock: true,
    all_shapes: true,
};

const XSTS_UPPAAL: Dialect = Dialect {
    name: "XSTS-UPPAAL",
    implies: "imply",
    in_state: |s| format!("{} == {}", s.region, s.state),
    leads_to: true,
    deadlock: true,
    all_shapes: true,
};

const THETA: Dialect = Dialect {
    name: "Theta",
    implies: "->",
    in_state: |s| format!("{} == {}", s.region, s.state),
    leads_to: false,
    deadlock: false,
    all_shapes: false,
};

/// Serializer for UPPAAL queries over automata networks.
#[derive(Debug, Clone, Copy, Default)]
pub struct UppaalSerializer;

/// Serializer for UPPAAL queries over networks generated from XSTS models,
/// where each region is a variable holding its active state.
#[derive(Debug, Clone, Copy, Default)]
pub struct XstsUppaalSerializer;

/// Serializer for Theta's XSTS property files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThetaSerializer;

impl PropertySerializer for UppaalSerializer {
    fn serialize(&self, formula: &StateFormula) -> Result<String, BackendError> {
        UPPAAL.query(formula)
    }
}

impl PropertySerializer for XstsUppaalSerializer {
    fn serialize(&self, formula: &StateFormula) -> Result<String, BackendError> {
        XSTS_UPPAAL.query(formula)
    }
}

impl PropertySerializer for ThetaSerializer {
    fn serialize(&self, formula: &StateFormula) -> Result<String, BackendError> {
        THETA.query(formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::syntax::{CompareOp, Value};

    fn idle() -> StateFormula {
        StateFormula::in_state("main", "Idle")
    }

    fn alarm() -> StateFormula {
        StateFormula::ag(StateFormula::implies(
            StateFormula::compare("count", CompareOp::Gt, Value::Int(3)),
            StateFormula::raised("Out", "alarm"),
        ))
    }

    #[test]
    fn test_uppaal() {
        let s = UppaalSerializer;
        insta::assert_snapshot!(s.serialize(&StateFormula::ef(idle())).unwrap(), @"E<> main.Idle");
        insta::assert_snapshot!(s.serialize(&StateFormula::deadlock_free()).unwrap(), @"A[] !deadlock");
        insta::assert_snapshot!(
            s.serialize(&alarm()).unwrap(),
            @"A[] ((count > 3) imply Out_alarm_Out)"
        );
        insta::assert_snapshot!(
            s.serialize(&StateFormula::leads_to(
                idle(),
                StateFormula::and([idle(), StateFormula::not(StateFormula::raised("Out", "alarm"))])
            ))
            .unwrap(),
            @"main.Idle --> (main.Idle && !Out_alarm_Out)"
        );
        insta::assert_snapshot!(s.serialize(&StateFormula::eg(idle())).unwrap(), @"E[] main.Idle");
    }

    #[test]
    fn test_xsts_uppaal() {
        let s = XstsUppaalSerializer;
        insta::assert_snapshot!(s.serialize(&StateFormula::af(idle())).unwrap(), @"A<> main == Idle");
        insta::assert_snapshot!(
            s.serialize(&StateFormula::ef(StateFormula::not(idle()))).unwrap(),
            @"E<> !(main == Idle)"
        );
    }

    #[test]
    fn test_theta() {
        let s = ThetaSerializer;
        insta::assert_snapshot!(
            s.serialize(&alarm()).unwrap(),
            @"A[] ((count > 3) -> Out_alarm_Out)"
        );
        insta::assert_display_snapshot!(
            s.serialize(&StateFormula::af(idle())).unwrap_err(),
            @"Theta cannot express AF main.Idle: only E<> and A[] properties are supported"
        );
        insta::assert_display_snapshot!(
            s.serialize(&StateFormula::deadlock_free()).unwrap_err(),
            @"Theta cannot express AG !deadlock: deadlock is not supported"
        );
    }

    #[test]
    fn test_unsupported_shapes() {
        let s = UppaalSerializer;
        insta::assert_display_snapshot!(
            s.serialize(&StateFormula::ef(StateFormula::ag(idle()))).unwrap_err(),
            @"UPPAAL cannot express EF AG main.Idle: nested temporal operators are not supported"
        );
        insta::assert_display_snapshot!(
            s.serialize(&idle()).unwrap_err(),
            @"UPPAAL cannot express main.Idle: a query needs a temporal operator at its root"
        );
    }
}
