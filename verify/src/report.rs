// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The outcome of a verification run.

use crate::error::{MappingError, QueryFailure};
use model::{result::ThreeStateBoolean, syntax::StateFormula, trace::ExecutionTrace};
use serde::{Deserialize, Serialize};

/// Where a dispatched query came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryKind {
    /// A property from a property package
    Formula,
    /// A line of a raw query file
    Raw,
    /// All queries of the run, combined into one invocation
    Batch,
}

/// The result of one dispatched query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    #[allow(missing_docs)]
    pub kind: QueryKind,
    /// The query as sent to the verifier (the printed property when it could
    /// not be serialized)
    pub query: String,
    /// The property, for queries from property packages
    pub formula: Option<StateFormula>,
    /// Human-readable label from a package comment or a query file comment
    pub label: Option<String>,
    #[allow(missing_docs)]
    pub result: ThreeStateBoolean,
    /// Why the result is undefined
    pub failure: Option<QueryFailure>,
}

/// A property that was decided by an earlier trace and never dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoveredRecord {
    #[allow(missing_docs)]
    pub formula: StateFormula,
    #[allow(missing_docs)]
    pub label: Option<String>,
    /// The value the trace determines
    pub result: ThreeStateBoolean,
}

/// The JSON artifact written for each result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultArtifact {
    #[allow(missing_docs)]
    pub query: String,
    #[allow(missing_docs)]
    pub result: ThreeStateBoolean,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Retained traces
    pub traces: Vec<ExecutionTrace>,
    /// One record per dispatched query, in dispatch order
    pub results: Vec<VerificationRecord>,
    /// Properties removed from the worklist by coverage
    pub covered: Vec<CoveredRecord>,
    /// Problems found while back-annotating traces
    pub mapping_errors: Vec<MappingError>,
    /// Whether the run was cancelled before it finished
    pub cancelled: bool,
}

fn reachability(result: ThreeStateBoolean) -> &'static str {
    match result {
        ThreeStateBoolean::True => "is reachable.",
        ThreeStateBoolean::False => "is NOT reachable.",
        ThreeStateBoolean::Undef => "is undefined.",
    }
}

impl VerificationRecord {
    /// A human-readable description of the result.
    pub fn sentence(&self) -> String {
        if self.kind == QueryKind::Batch {
            return "Test generation has been finished.".to_string();
        }
        if let Some(formula) = &self.formula {
            if *formula == StateFormula::deadlock_free() {
                return match self.result {
                    ThreeStateBoolean::True => "No deadlock.",
                    ThreeStateBoolean::False => "There can be deadlock in the system.",
                    ThreeStateBoolean::Undef => "Not determined if there can be deadlock.",
                }
                .to_string();
            }
            if let Some(body) = formula.as_reachability() {
                let label = self.label.clone().unwrap_or_else(|| body.to_string());
                return format!("{label} {}", reachability(self.result));
            }
        } else if let Some(label) = &self.label {
            return format!("{label} {}", reachability(self.result));
        }
        format!("{}: {}", self.query, self.result)
    }

    /// The JSON result artifact for this record.
    pub fn artifact(&self) -> ResultArtifact {
        ResultArtifact {
            query: self.query.clone(),
            result: self.result,
        }
    }
}

impl RunReport {
    /// Records of queries that ended without a decided result.
    pub fn undetermined(&self) -> impl Iterator<Item = &VerificationRecord> {
        self.results.iter().filter(|r| !r.result.is_decided())
    }

    /// One sentence per dispatched query, followed by a note if the run was
    /// cancelled.
    pub fn sentences(&self) -> Vec<String> {
        let mut sentences: Vec<String> = self.results.iter().map(|r| r.sentence()).collect();
        if self.cancelled {
            sentences.push("Verification was cancelled.".to_string());
        }
        sentences
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        kind: QueryKind,
        formula: Option<StateFormula>,
        label: Option<&str>,
        result: ThreeStateBoolean,
    ) -> VerificationRecord {
        VerificationRecord {
            kind,
            query: "E<> main.Idle".to_string(),
            formula,
            label: label.map(|s| s.to_string()),
            result,
            failure: None,
        }
    }

    #[test]
    fn test_sentences() {
        let idle = StateFormula::ef(StateFormula::in_state("main", "Idle"));
        let deadlock = Some(StateFormula::deadlock_free());
        let report = RunReport {
            results: vec![
                record(QueryKind::Formula, deadlock.clone(), None, ThreeStateBoolean::True),
                record(QueryKind::Formula, deadlock, None, ThreeStateBoolean::Undef),
                record(QueryKind::Formula, Some(idle.clone()), None, ThreeStateBoolean::True),
                record(QueryKind::Formula, Some(idle), Some("Idle"), ThreeStateBoolean::False),
                record(QueryKind::Raw, None, Some("Idle state"), ThreeStateBoolean::Undef),
                record(QueryKind::Raw, None, None, ThreeStateBoolean::False),
                record(
                    QueryKind::Formula,
                    Some(StateFormula::af(StateFormula::in_state("main", "Idle"))),
                    None,
                    ThreeStateBoolean::True,
                ),
                record(QueryKind::Batch, None, None, ThreeStateBoolean::True),
            ],
            cancelled: true,
            ..Default::default()
        };
        insta::assert_snapshot!(report.sentences().join("\n"), @r###"
        No deadlock.
        Not determined if there can be deadlock.
        main.Idle is reachable.
        Idle is NOT reachable.
        Idle state is undefined.
        E<> main.Idle: FALSE
        E<> main.Idle: TRUE
        Test generation has been finished.
        Verification was cancelled.
        "###);
        assert_eq!(report.undetermined().count(), 2);
    }

    #[test]
    fn test_result_artifact() {
        let r = record(QueryKind::Raw, None, None, ThreeStateBoolean::Undef);
        insta::assert_snapshot!(
            serde_json::to_string(&r.artifact()).unwrap(),
            @r###"{"query":"E<> main.Idle","result":"UNDEF"}"###
        );
    }
}
