// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Drive whole verification runs against a scripted backend.

use backend::{
    backends::BackendType,
    conf::BackendConf,
    imp::{Backend, BackendError, Outcome},
    serialize::{PropertySerializer, UppaalSerializer},
};
use model::{
    component::{Component, ComponentBuilder},
    result::ThreeStateBoolean,
    syntax::{CommentableStateFormula, CompareOp, PropertyPackage, StateFormula, Value},
    trace::{ExecutionTrace, Step},
};
use runner::proc::ProcPid;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};
use test_log::test;
use verify::{
    conf::{CancelFlag, MappingPolicy, VerificationOptions},
    error::{QueryFailure, RunError},
    reduce,
    report::{QueryKind, RunReport},
    run_verification, run_with_conf,
};

#[derive(Debug, Clone)]
enum Reply {
    Answer(ThreeStateBoolean, Option<Vec<Step>>),
    Hang,
    Fail(&'static str),
}

/// A backend that answers queries from a script and records every query file
/// it is asked to run.
#[derive(Debug)]
struct ScriptedBackend {
    available: bool,
    replies: Vec<(String, Reply)>,
    component: Arc<Component>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<(&str, Reply)>) -> Self {
        Self {
            available: true,
            replies: replies
                .into_iter()
                .map(|(q, r)| (q.to_string(), r))
                .collect(),
            component: Component::opaque("Controller"),
            calls: Mutex::new(vec![]),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn serialize(&self, formula: &StateFormula) -> Result<String, BackendError> {
        UppaalSerializer.serialize(formula)
    }

    fn health_check(&self) -> Result<(), BackendError> {
        if self.available {
            Ok(())
        } else {
            Err(BackendError::Unavailable("scripted backend is down".to_string()))
        }
    }

    fn execute(&self, _model: &Path, query: &Path, pid: &ProcPid) -> Result<Outcome, BackendError> {
        let query = fs::read_to_string(query)?;
        self.calls.lock().unwrap().push(query.clone());
        let reply = self
            .replies
            .iter()
            .find(|(q, _)| *q == query)
            .map(|(_, r)| r.clone())
            .unwrap_or(Reply::Answer(ThreeStateBoolean::False, None));
        match reply {
            Reply::Answer(result, steps) => Ok(Outcome {
                result,
                trace: steps.map(|steps| ExecutionTrace::new(self.component.clone(), steps)),
            }),
            Reply::Hang => {
                while !pid.is_killed() {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(BackendError::Killed)
            }
            Reply::Fail(msg) => Err(BackendError::QueryFailed(msg.to_string())),
        }
    }
}

fn reach(state: &str) -> StateFormula {
    StateFormula::ef(StateFormula::in_state("main", state))
}

fn visits(states: &[&str]) -> Option<Vec<Step>> {
    Some(states.iter().map(|s| Step::new().active("main", s)).collect())
}

struct Fixture {
    _dir: tempfile::TempDir,
    model: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("Controller.xml");
    fs::write(&model, "<nta/>").unwrap();
    Fixture { _dir: dir, model }
}

fn run(
    fixture: &Fixture,
    backend: &Arc<ScriptedBackend>,
    formulas: Vec<StateFormula>,
    raw: &[PathBuf],
    options: &VerificationOptions,
) -> RunReport {
    run_verification(
        &fixture.model,
        &[PropertyPackage::new("properties", formulas)],
        raw,
        options,
        backend.clone(),
        &CancelFlag::new(),
    )
    .unwrap()
}

fn optimized() -> VerificationOptions {
    VerificationOptions {
        optimize: true,
        ..Default::default()
    }
}

#[test]
fn covered_property_is_not_dispatched() {
    let f = fixture();
    let backend = Arc::new(ScriptedBackend::new(vec![
        (
            "E<> main.S",
            Reply::Answer(ThreeStateBoolean::True, visits(&["Init", "S"])),
        ),
        ("A[] !deadlock", Reply::Answer(ThreeStateBoolean::True, None)),
    ]));
    let report = run(
        &f,
        &backend,
        vec![reach("S"), reach("S"), StateFormula::deadlock_free()],
        &[],
        &optimized(),
    );
    assert_eq!(backend.calls(), vec!["E<> main.S", "A[] !deadlock"]);
    assert_eq!(report.results.len(), 2);
    assert_eq!(report.covered.len(), 1);
    assert_eq!(report.covered[0].formula, reach("S"));
    assert_eq!(report.covered[0].result, ThreeStateBoolean::True);
    assert_eq!(report.traces.len(), 1);
    assert!(!report.cancelled);
    insta::assert_snapshot!(report.sentences().join("\n"), @r###"
    main.S is reachable.
    No deadlock.
    "###);
}

#[test]
fn without_optimization_everything_is_dispatched() {
    let f = fixture();
    let backend = Arc::new(ScriptedBackend::new(vec![(
        "E<> main.S",
        Reply::Answer(ThreeStateBoolean::True, visits(&["Init", "S"])),
    )]));
    let report = run(
        &f,
        &backend,
        vec![reach("S"), reach("S")],
        &[],
        &VerificationOptions::default(),
    );
    assert_eq!(backend.calls().len(), 2);
    assert_eq!(report.results.len(), 2);
    assert!(report.covered.is_empty());
    assert_eq!(report.traces.len(), 2);
}

#[test]
fn timeout_is_undefined_and_run_continues() {
    let f = fixture();
    let backend = Arc::new(ScriptedBackend::new(vec![
        ("E<> main.Stuck", Reply::Hang),
        (
            "E<> main.S",
            Reply::Answer(ThreeStateBoolean::True, visits(&["S"])),
        ),
    ]));
    let options = VerificationOptions {
        timeout: Duration::from_secs(1),
        ..Default::default()
    };
    let start = Instant::now();
    let report = run(&f, &backend, vec![reach("Stuck"), reach("S")], &[], &options);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "{elapsed:?}");

    assert_eq!(backend.calls().len(), 2);
    assert_eq!(report.results[0].result, ThreeStateBoolean::Undef);
    assert_eq!(report.results[0].failure, Some(QueryFailure::Timeout));
    assert_eq!(report.results[1].result, ThreeStateBoolean::True);
    assert_eq!(report.traces.len(), 1);
    assert_eq!(report.traces[0].steps, visits(&["S"]).unwrap());
    // query files are cleaned up after every query
    let leftovers: Vec<_> = fs::read_dir(f.model.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .filter(|n| n != "Controller.xml")
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[test]
fn reuse_state_space_dispatches_once() {
    let f = fixture();
    let backend = Arc::new(ScriptedBackend::new(vec![(
        "E<> main.A\nE<> main.B\nE<> main.C",
        Reply::Answer(ThreeStateBoolean::True, None),
    )]));
    let options = VerificationOptions {
        reuse_state_space: true,
        ..Default::default()
    };
    let report = run(&f, &backend, vec![reach("A"), reach("B"), reach("C")], &[], &options);
    assert_eq!(backend.calls(), vec!["E<> main.A\nE<> main.B\nE<> main.C"]);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].kind, QueryKind::Batch);
    assert_eq!(report.results[0].result, ThreeStateBoolean::True);
    assert_eq!(
        report.results[0].sentence(),
        "Test generation has been finished."
    );
}

#[test]
fn raw_queries_run_after_properties_without_reduction() {
    let f = fixture();
    let queries = f.model.with_file_name("extra.q");
    fs::write(&queries, "/* S state */\nE<> main.S\n\nE<> main.T\n/* trailing */\n").unwrap();
    let backend = Arc::new(ScriptedBackend::new(vec![
        (
            "E<> main.S",
            Reply::Answer(ThreeStateBoolean::True, visits(&["S", "T"])),
        ),
        (
            "E<> main.T",
            Reply::Answer(ThreeStateBoolean::True, visits(&["T"])),
        ),
    ]));
    let report = run(&f, &backend, vec![reach("S")], &[queries], &optimized());
    // the raw copy of the covered property is still dispatched
    assert_eq!(backend.calls(), vec!["E<> main.S", "E<> main.S", "E<> main.T"]);
    assert_eq!(report.results[1].kind, QueryKind::Raw);
    // the later traces witness nothing new
    assert_eq!(report.traces.len(), 1);
    insta::assert_snapshot!(report.sentences().join("\n"), @r###"
    main.S is reachable.
    S state is reachable.
    E<> main.T: TRUE
    "###);
}

#[test]
fn failures_are_recorded() {
    let f = fixture();
    let backend = Arc::new(ScriptedBackend::new(vec![
        ("E<> main.Bad", Reply::Fail("syntax error at line 1")),
        ("E<> main.Unsure", Reply::Answer(ThreeStateBoolean::Undef, None)),
    ]));
    let nested = StateFormula::ef(StateFormula::ag(StateFormula::in_state("main", "S")));
    let report = run(
        &f,
        &backend,
        vec![reach("Bad"), nested, reach("Unsure"), reach("Other")],
        &[],
        &VerificationOptions::default(),
    );
    // the nested property cannot be expressed and is never dispatched
    assert_eq!(
        backend.calls(),
        vec!["E<> main.Bad", "E<> main.Unsure", "E<> main.Other"]
    );
    let failures: Vec<_> = report
        .results
        .iter()
        .map(|r| r.failure.as_ref().map(|f| f.to_string()))
        .collect();
    insta::assert_debug_snapshot!(failures, @r###"
    [
        Some(
            "execution failed: query failed:\nsyntax error at line 1",
        ),
        Some(
            "unsupported: UPPAAL cannot express EF AG main.S: nested temporal operators are not supported",
        ),
        Some(
            "execution failed: the verifier completed without deciding the query",
        ),
        None,
    ]
    "###);
    assert_eq!(report.undetermined().count(), 3);
    assert_eq!(report.results[3].result, ThreeStateBoolean::False);
}

#[test]
fn cancellation_stops_the_run() {
    let f = fixture();
    let backend = Arc::new(ScriptedBackend::new(vec![("E<> main.Stuck", Reply::Hang)]));
    let cancel = CancelFlag::new();
    let canceller = cancel.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(300));
        canceller.cancel();
    });
    let start = Instant::now();
    let report = run_verification(
        &f.model,
        &[PropertyPackage::new("properties", [reach("Stuck"), reach("S")])],
        &[],
        &VerificationOptions::default(),
        backend.clone(),
        &cancel,
    )
    .unwrap();
    assert!(start.elapsed() < Duration::from_secs(30));
    assert!(report.cancelled);
    assert_eq!(backend.calls(), vec!["E<> main.Stuck"]);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].failure, Some(QueryFailure::Cancelled));
    assert_eq!(
        report.sentences().last().map(|s| s.as_str()),
        Some("Verification was cancelled.")
    );
}

#[test]
fn cancelled_before_start() {
    let f = fixture();
    let backend = Arc::new(ScriptedBackend::new(vec![]));
    let cancel = CancelFlag::new();
    cancel.cancel();
    let report = run_verification(
        &f.model,
        &[PropertyPackage::new("properties", [reach("S")])],
        &[],
        &VerificationOptions::default(),
        backend.clone(),
        &cancel,
    )
    .unwrap();
    assert!(report.cancelled);
    assert!(backend.calls().is_empty());
    assert!(report.results.is_empty());
}

#[test]
fn run_aborting_errors() {
    let f = fixture();
    let mut down = ScriptedBackend::new(vec![]);
    down.available = false;
    let err = run_verification(
        &f.model,
        &[],
        &[],
        &VerificationOptions::default(),
        Arc::new(down),
        &CancelFlag::new(),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::BackendUnavailable(_)), "{err}");

    let missing = f.model.with_file_name("missing.q");
    let err = run_verification(
        &f.model,
        &[],
        &[missing],
        &VerificationOptions::default(),
        Arc::new(ScriptedBackend::new(vec![])),
        &CancelFlag::new(),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::QueryFile { .. }), "{err}");

    let conf = BackendConf {
        languages: vec![BackendType::Uppaal, BackendType::Theta],
        ..Default::default()
    };
    let err = run_with_conf(
        &f.model,
        &[],
        &[],
        &VerificationOptions::default(),
        &conf,
        &CancelFlag::new(),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Config(_)), "{err}");

    let err = run_verification(
        &f.model.with_file_name("Nothing.xml"),
        &[],
        &[],
        &VerificationOptions::default(),
        Arc::new(ScriptedBackend::new(vec![])),
        &CancelFlag::new(),
    )
    .unwrap_err();
    assert!(matches!(err, RunError::Config(_)), "{err}");
}

#[test]
fn redundant_traces_are_removed_at_the_end() {
    let f = fixture();
    let backend = Arc::new(ScriptedBackend::new(vec![
        (
            "E<> main.A",
            Reply::Answer(ThreeStateBoolean::True, visits(&["A"])),
        ),
        (
            "E<> main.B",
            Reply::Answer(ThreeStateBoolean::True, visits(&["B", "A", "B"])),
        ),
    ]));
    let report = run(&f, &backend, vec![reach("A"), reach("B")], &[], &optimized());
    assert_eq!(report.results.len(), 2);
    // the second trace is trimmed to B,A and then subsumes the first one
    assert_eq!(report.traces.len(), 1);
    assert_eq!(report.traces[0].steps, visits(&["B", "A"]).unwrap());
}

fn counted(steps: &[(&str, i64)]) -> Option<Vec<Step>> {
    Some(
        steps
            .iter()
            .map(|(s, n)| Step::new().active("main", s).assign("count", Value::Int(*n)))
            .collect(),
    )
}

#[test]
fn traces_reaching_new_states_are_kept() {
    let f = fixture();
    let backend = Arc::new(ScriptedBackend::new(vec![
        (
            "E<> main.B",
            Reply::Answer(ThreeStateBoolean::True, counted(&[("A", 0), ("B", 1)])),
        ),
        (
            "E<> main.Done",
            Reply::Answer(
                ThreeStateBoolean::False,
                counted(&[("A", 0), ("A", 1), ("A", 1)]),
            ),
        ),
    ]));
    // main is A while count is 1 only in the second trace
    let goal = StateFormula::ef(StateFormula::and([
        StateFormula::in_state("main", "A"),
        StateFormula::compare("count", CompareOp::Eq, Value::Int(1)),
    ]));
    let report = run(
        &f,
        &backend,
        vec![reach("B"), reach("Done"), goal.clone()],
        &[],
        &optimized(),
    );
    assert_eq!(backend.calls(), vec!["E<> main.B", "E<> main.Done"]);
    assert_eq!(report.covered.len(), 1);
    assert_eq!(report.covered[0].formula, goal);
    assert_eq!(report.traces.len(), 2);
    assert_eq!(report.traces[1].steps, counted(&[("A", 0), ("A", 1)]).unwrap());
    assert!(report
        .traces
        .iter()
        .any(|t| reduce::decide(t, &goal) == Some(true)));
}

#[test]
fn traces_are_back_annotated() {
    let f = fixture();
    let original = ComponentBuilder::new("Controller")
        .region("main", ["Idle", "Busy"])
        .build();
    let unfolded = ComponentBuilder::new("ControllerUnfolded")
        .derived_from(&original)
        .traced_region("controller_main", ["Idle", "Busy"], Some("main"))
        .region("scheduler", ["Tick"])
        .build();
    let mut backend = ScriptedBackend::new(vec![(
        "E<> main.Busy",
        Reply::Answer(
            ThreeStateBoolean::True,
            Some(vec![Step::new()
                .active("controller_main", "Busy")
                .active("scheduler", "Tick")]),
        ),
    )]);
    backend.component = unfolded;
    let backend = Arc::new(backend);
    let packages = [PropertyPackage {
        name: "properties".to_string(),
        formulas: vec![CommentableStateFormula {
            comment: Some("Busy".to_string()),
            formula: reach("Busy"),
        }],
    }];

    let lenient = VerificationOptions {
        back_annotate: true,
        ..Default::default()
    };
    let report = run_verification(
        &f.model,
        &packages,
        &[],
        &lenient,
        backend.clone(),
        &CancelFlag::new(),
    )
    .unwrap();
    assert_eq!(report.traces.len(), 1);
    assert_eq!(report.traces[0].component.name(), "Controller");
    assert_eq!(report.traces[0].steps, vec![Step::new().active("main", "Busy")]);
    assert_eq!(report.mapping_errors.len(), 1);
    assert_eq!(report.sentences(), vec!["Busy is reachable."]);

    let strict = VerificationOptions {
        mapping: MappingPolicy::Strict,
        ..lenient
    };
    let report = run_verification(
        &f.model,
        &packages,
        &[],
        &strict,
        backend.clone(),
        &CancelFlag::new(),
    )
    .unwrap();
    assert!(report.traces.is_empty());
    assert_eq!(report.mapping_errors.len(), 1);
    assert_eq!(report.results[0].result, ThreeStateBoolean::True);
}
