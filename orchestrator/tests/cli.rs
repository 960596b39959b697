// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Run the orchestrator binary against a scripted adapter.

use model::syntax::{CommentableStateFormula, PropertyPackage, StateFormula};
use nix::{
    sys::signal::{self, Signal},
    unistd::Pid,
};
use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    thread,
    time::{Duration, Instant},
};

const ADAPTER: &str = r#"
query="$(cat "$2")"
case "$query" in
  "E<> main.Busy") echo '{"result": "TRUE", "trace": {"component": "Controller", "steps": [{"configuration": {"main": "Idle"}}, {"configuration": {"main": "Busy"}}]}}';;
  "A[] !deadlock") echo '{"result": "TRUE"}';;
  *) echo '{"result": "FALSE"}';;
esac
"#;

const HANGING_ADAPTER: &str = r#"
echo $$ > adapter.pid
exec sleep 30
"#;

fn orchestrator() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_orchestrator"));
    cmd.env_remove("RUST_LOG");
    cmd
}

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("adapter.sh"), ADAPTER).unwrap();
        fs::write(dir.path().join("Controller.xml"), "<nta/>").unwrap();
        let package = PropertyPackage {
            name: "controller".to_string(),
            formulas: vec![
                CommentableStateFormula {
                    comment: Some("Busy".to_string()),
                    formula: StateFormula::ef(StateFormula::in_state("main", "Busy")),
                },
                CommentableStateFormula {
                    comment: None,
                    formula: StateFormula::ef(StateFormula::in_state("main", "Idle")),
                },
                CommentableStateFormula {
                    comment: None,
                    formula: StateFormula::deadlock_free(),
                },
            ],
        };
        fs::write(
            dir.path().join("properties.json"),
            serde_json::to_string(&package).unwrap(),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn run(&self, args: &[&str]) -> Output {
        orchestrator()
            .current_dir(self.dir.path())
            .args(args)
            .output()
            .expect("could not run orchestrator")
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8(out.stdout.clone()).expect("non-utf8 output")
}

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn verify_with_optimization() {
    let ws = Workspace::new();
    let out = ws.run(&[
        "verify",
        "--adapter=sh",
        "--adapter-arg=adapter.sh",
        "--optimize",
        "-p",
        "properties.json",
        "-o",
        "out",
        "Controller.xml",
    ]);
    assert!(out.status.success(), "{out:?}");
    insta::assert_snapshot!(stdout(&out), @r###"
    Busy is reachable.
    No deadlock.
    EF main.Idle: TRUE (covered by an earlier trace)
    "###);
    assert_eq!(
        file_names(&ws.path("out")),
        vec![
            "ExecutionTrace0.json",
            "ExecutionTrace0.result.json",
            "ExecutionTrace1.result.json",
        ]
    );
    let result: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(ws.path("out/ExecutionTrace1.result.json")).unwrap())
            .unwrap();
    assert_eq!(result["query"], "A[] !deadlock");
    assert_eq!(result["result"], "TRUE");
    let trace: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(ws.path("out/ExecutionTrace0.json")).unwrap())
            .unwrap();
    assert_eq!(trace["component"], "Controller");
    assert_eq!(trace["steps"].as_array().unwrap().len(), 2);
    // no query files are left next to the model
    assert_eq!(
        file_names(ws.dir.path()),
        vec!["Controller.xml", "adapter.sh", "out", "properties.json"]
    );
}

#[test]
fn verify_raw_queries() {
    let ws = Workspace::new();
    fs::create_dir(ws.path("queries")).unwrap();
    fs::write(ws.path("queries/b.q"), "E<> main.Error\n").unwrap();
    fs::write(ws.path("queries/a.q"), "/* busy state */\nE<> main.Busy\n").unwrap();
    let out = ws.run(&[
        "verify",
        "--adapter=sh",
        "--adapter-arg=adapter.sh",
        "--query-dir=queries",
        "Controller.xml",
    ]);
    assert!(out.status.success(), "{out:?}");
    insta::assert_snapshot!(stdout(&out), @r###"
    busy state is reachable.
    E<> main.Error: FALSE
    "###);
}

/// Wait for `cond` for up to ten seconds.
fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(10) {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

/// Whether the process exists and is not a zombie.
fn is_running(pid: i32) -> bool {
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => !stat
            .rsplit_once(") ")
            .map_or(false, |(_, rest)| rest.starts_with('Z')),
        Err(_) => false,
    }
}

#[test]
fn interrupt_twice_kills_the_adapter() {
    let ws = Workspace::new();
    fs::write(ws.path("hang.sh"), HANGING_ADAPTER).unwrap();
    let mut child = orchestrator()
        .current_dir(ws.dir.path())
        .args([
            "verify",
            "--adapter=sh",
            "--adapter-arg=hang.sh",
            "-p",
            "properties.json",
            "Controller.xml",
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let pid_file = ws.path("adapter.pid");
    assert!(eventually(|| fs::read_to_string(&pid_file)
        .map_or(false, |s| s.trim().parse::<i32>().is_ok())));
    let adapter: i32 = fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
    assert!(is_running(adapter));

    let orchestrator = Pid::from_raw(child.id() as i32);
    signal::kill(orchestrator, Signal::SIGINT).unwrap();
    thread::sleep(Duration::from_millis(20));
    signal::kill(orchestrator, Signal::SIGINT).unwrap();

    assert!(eventually(|| matches!(child.try_wait(), Ok(Some(_)))));
    assert_eq!(child.wait().unwrap().code(), Some(130));
    assert!(eventually(|| !is_running(adapter)));
}

#[test]
fn verify_fails_without_model() {
    let ws = Workspace::new();
    let out = ws.run(&[
        "verify",
        "--adapter=sh",
        "--adapter-arg=adapter.sh",
        "-p",
        "properties.json",
        "Missing.xml",
    ]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).is_empty());
}

#[test]
fn print_queries() {
    let ws = Workspace::new();
    let out = ws.run(&["print", "-l", "theta", "properties.json"]);
    assert!(out.status.success(), "{out:?}");
    insta::assert_snapshot!(stdout(&out), @r###"
    /* Busy */
    E<> main == Busy
    E<> main == Idle
    // Theta cannot express AG !deadlock: deadlock is not supported
    "###);
}

#[test]
fn check_missing_adapter() {
    let ws = Workspace::new();
    let out = ws.run(&["check", "--adapter=surely-not-an-adapter"]);
    assert_eq!(out.status.code(), Some(1));
    insta::assert_snapshot!(
        String::from_utf8(out.stderr).unwrap().trim(),
        @"verification backend is unavailable: could not find UPPAAL adapter surely-not-an-adapter"
    );
}
