// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The AST for temporal properties and the property packages that group them.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An event on a port, identified by the port name and the event name.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signal {
    /// Port the event is transmitted on
    pub port: String,
    /// Event name, unique within the port's interface
    pub event: String,
}

impl Signal {
    /// Smart constructor for a Signal that takes arguments by reference.
    pub fn new(port: &str, event: &str) -> Self {
        Self {
            port: port.to_string(),
            event: event.to_string(),
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.port, self.event)
    }
}

/// A state of a region.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateRef {
    /// The region containing the state
    pub region: String,
    /// The state name, unique within the region
    pub state: String,
}

impl StateRef {
    /// Smart constructor for a StateRef that takes arguments by reference.
    pub fn new(region: &str, state: &str) -> Self {
        Self {
            region: region.to_string(),
            state: state.to_string(),
        }
    }
}

/// The value of a variable in a step.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Boolean value
    Bool(bool),
    /// Integer value (enumeration literals are encoded as integers)
    Int(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
        }
    }
}

/// Comparison operators usable in variable predicates
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// An atomic predicate over a single state of the model.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Predicate {
    /// A constant true or false
    Literal(bool),
    /// The given state is active in its region
    InState(StateRef),
    /// Compare a variable against a constant
    Compare {
        /// Variable name
        var: String,
        /// Comparison operator
        op: CompareOp,
        /// Constant to compare with
        value: Value,
    },
    /// The given output event is raised
    Raised(Signal),
}

/// Path quantifiers of CTL
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PathQuantifier {
    All,
    Exists,
}

/// Temporal operators applied under a path quantifier
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TemporalOp {
    /// Always (G, `[]`)
    Globally,
    /// Eventually (F, `<>`)
    Finally,
}

/// N-ary logical operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NOp {
    And,
    Or,
}

/// A temporal-logic property over the states of a model.
///
/// Formulas are CTL-style: a path quantifier is always paired with exactly one
/// temporal operator (`A G p`, `E F p`, ...). In addition, `p --> q` stands for
/// `A G (p -> A F q)` and [`StateFormula::Deadlock`] holds in states without
/// any outgoing transition.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StateFormula {
    /// An atomic state predicate
    Atom(Predicate),
    /// Negation
    Not(Box<StateFormula>),
    /// An applied n-ary operation
    NAryOp(NOp, Vec<StateFormula>),
    /// Implication
    Implies(Box<StateFormula>, Box<StateFormula>),
    /// A path-quantified temporal operator
    #[allow(missing_docs)]
    Quantified {
        quantifier: PathQuantifier,
        op: TemporalOp,
        body: Box<StateFormula>,
    },
    /// Leads-to: whenever the left side holds, the right side eventually holds
    LeadsTo(Box<StateFormula>, Box<StateFormula>),
    /// The current state is a deadlock
    Deadlock,
}

impl From<Predicate> for StateFormula {
    fn from(value: Predicate) -> Self {
        Self::Atom(value)
    }
}

impl From<&StateFormula> for StateFormula {
    fn from(value: &Self) -> Self {
        value.clone()
    }
}

/// Smart constructors for StateFormula. These take arguments by value or by
/// reference (with an automatic clone).
impl StateFormula {
    /// Smart constructor for a literal
    pub fn literal(value: bool) -> Self {
        Self::Atom(Predicate::Literal(value))
    }

    /// Smart constructor for "state is active"
    pub fn in_state(region: &str, state: &str) -> Self {
        Self::Atom(Predicate::InState(StateRef::new(region, state)))
    }

    /// Smart constructor for "output event is raised"
    pub fn raised(port: &str, event: &str) -> Self {
        Self::Atom(Predicate::Raised(Signal::new(port, event)))
    }

    /// Smart constructor for a variable comparison
    pub fn compare(var: &str, op: CompareOp, value: Value) -> Self {
        Self::Atom(Predicate::Compare {
            var: var.to_string(),
            op,
            value,
        })
    }

    /// Smart constructor for not. Cancels double negation.
    pub fn not<T>(t: T) -> Self
    where
        T: Into<StateFormula>,
    {
        match t.into() {
            Self::Not(body) => *body,
            t => Self::Not(Box::new(t)),
        }
    }

    fn flatten_terms_of_op(ts: Vec<StateFormula>, op: NOp) -> Vec<StateFormula> {
        ts.into_iter()
            .flat_map(|t| match t {
                Self::NAryOp(op2, ts2) if op == op2 => ts2,
                _ => vec![t],
            })
            .collect()
    }

    /// Smart constructor for And. Zero and one conjuncts are handled specially,
    /// and conjuncts that are And are flattened (but not recursively).
    pub fn and<I>(ts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<StateFormula>,
    {
        let mut ts = ts.into_iter().map(|x| x.into()).collect_vec();
        if ts.is_empty() {
            Self::literal(true)
        } else if ts.len() == 1 {
            return ts.remove(0);
        } else {
            Self::NAryOp(NOp::And, Self::flatten_terms_of_op(ts, NOp::And))
        }
    }

    /// Smart constructor for Or. Zero and one disjuncts are handled specially,
    /// and disjuncts that are Or are flattened (but not recursively).
    pub fn or<I>(ts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<StateFormula>,
    {
        let mut ts = ts.into_iter().map(|x| x.into()).collect_vec();
        if ts.is_empty() {
            Self::literal(false)
        } else if ts.len() == 1 {
            return ts.remove(0);
        } else {
            Self::NAryOp(NOp::Or, Self::flatten_terms_of_op(ts, NOp::Or))
        }
    }

    /// Smart constructor for `lhs -> rhs`
    pub fn implies<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<StateFormula>,
        T2: Into<StateFormula>,
    {
        Self::Implies(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    fn quantified<T>(quantifier: PathQuantifier, op: TemporalOp, body: T) -> Self
    where
        T: Into<StateFormula>,
    {
        Self::Quantified {
            quantifier,
            op,
            body: Box::new(body.into()),
        }
    }

    /// `E F p`: some path reaches a state satisfying `p`
    pub fn ef<T: Into<StateFormula>>(body: T) -> Self {
        Self::quantified(PathQuantifier::Exists, TemporalOp::Finally, body)
    }

    /// `A G p`: `p` holds in every reachable state
    pub fn ag<T: Into<StateFormula>>(body: T) -> Self {
        Self::quantified(PathQuantifier::All, TemporalOp::Globally, body)
    }

    /// `A F p`: every path eventually reaches a state satisfying `p`
    pub fn af<T: Into<StateFormula>>(body: T) -> Self {
        Self::quantified(PathQuantifier::All, TemporalOp::Finally, body)
    }

    /// `E G p`: some path stays in states satisfying `p` forever
    pub fn eg<T: Into<StateFormula>>(body: T) -> Self {
        Self::quantified(PathQuantifier::Exists, TemporalOp::Globally, body)
    }

    /// `p --> q`
    pub fn leads_to<T1, T2>(lhs: T1, rhs: T2) -> Self
    where
        T1: Into<StateFormula>,
        T2: Into<StateFormula>,
    {
        Self::LeadsTo(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// The deadlock-freedom property `A G not deadlock`
    pub fn deadlock_free() -> Self {
        Self::ag(Self::not(Self::Deadlock))
    }

    /// Whether this formula mentions a temporal operator (or deadlock, which
    /// depends on the transition relation rather than a single state).
    pub fn is_temporal(&self) -> bool {
        match self {
            Self::Atom(_) => false,
            Self::Not(t) => t.is_temporal(),
            Self::NAryOp(_, ts) => ts.iter().any(|t| t.is_temporal()),
            Self::Implies(lhs, rhs) => lhs.is_temporal() || rhs.is_temporal(),
            Self::Quantified { .. } | Self::LeadsTo(..) | Self::Deadlock => true,
        }
    }

    /// If this formula is `E F p` for a state predicate `p`, return `p`.
    pub fn as_reachability(&self) -> Option<&StateFormula> {
        match self {
            Self::Quantified {
                quantifier: PathQuantifier::Exists,
                op: TemporalOp::Finally,
                body,
            } if !body.is_temporal() => Some(body),
            _ => None,
        }
    }
}

/// A formula with an optional human-readable comment.
#[derive(PartialEq, Eq, Clone, Debug, Serialize, Deserialize)]
pub struct CommentableStateFormula {
    /// Comment attached to the formula, used as a label in result sentences
    #[serde(default)]
    pub comment: Option<String>,
    /// The property itself
    pub formula: StateFormula,
}

/// An ordered collection of properties.
#[derive(PartialEq, Eq, Clone, Debug, Default, Serialize, Deserialize)]
pub struct PropertyPackage {
    /// Name of the package
    #[serde(default)]
    pub name: String,
    /// Properties in declaration order
    pub formulas: Vec<CommentableStateFormula>,
}

impl PropertyPackage {
    /// Create a package from bare formulas, without comments.
    pub fn new<I>(name: &str, formulas: I) -> Self
    where
        I: IntoIterator<Item = StateFormula>,
    {
        Self {
            name: name.to_string(),
            formulas: formulas
                .into_iter()
                .map(|formula| CommentableStateFormula {
                    comment: None,
                    formula,
                })
                .collect(),
        }
    }

    /// Parse a package from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
