// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The orchestrator binary's command-line interface.

use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    process,
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use backend::{backends::BackendType, conf::BackendConf, imp::BackendError};
use clap::Args;
use model::{component::ComponentRegistry, syntax::PropertyPackage};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use runner::conf::VerifierCmd;
use verify::{
    conf::{CancelFlag, MappingPolicy, VerificationOptions},
    output::ArtifactWriter,
    report::RunReport,
    run_with_conf,
};
use walkdir::WalkDir;

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum Language {
    Uppaal,
    Theta,
    XstsUppaal,
}

impl From<Language> for BackendType {
    fn from(value: Language) -> Self {
        match value {
            Language::Uppaal => BackendType::Uppaal,
            Language::Theta => BackendType::Theta,
            Language::XstsUppaal => BackendType::XstsUppaal,
        }
    }
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
struct BackendArgs {
    #[arg(value_enum, short, long = "language", alias = "backend", default_value = "uppaal")]
    /// Analysis language; exactly one must be selected
    languages: Vec<Language>,

    #[arg(long)]
    /// Adapter command to run instead of the language's default adapter
    adapter: Option<String>,

    #[arg(long = "adapter-arg")]
    /// Argument to the adapter command; `{model}` and `{query}` are replaced
    /// by the model and query files, which are appended if neither appears
    adapter_args: Vec<String>,

    #[arg(long)]
    /// JSON file describing the components of the model and the components
    /// they are derived from
    components: Option<PathBuf>,
}

impl BackendArgs {
    fn conf(&self) -> Result<BackendConf, String> {
        let registry = match &self.components {
            Some(path) => ComponentRegistry::load(path)
                .map_err(|err| format!("could not load components from {}: {err}", path.display()))?,
            None => ComponentRegistry::new(),
        };
        let adapter = self.adapter.as_ref().map(|cmd| {
            let mut cmd = VerifierCmd::new(cmd);
            cmd.args(&self.adapter_args);
            cmd
        });
        Ok(BackendConf {
            languages: self.languages.iter().map(|&l| l.into()).collect(),
            adapter,
            registry,
        })
    }
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
struct VerifyArgs {
    #[command(flatten)]
    backend: BackendArgs,

    #[arg(short, long)]
    /// Property package (JSON) to check
    properties: Vec<PathBuf>,

    #[arg(short, long)]
    /// Query file to check as-is, after all properties
    queries: Vec<PathBuf>,

    #[arg(long)]
    /// Directory whose query files are all checked as-is, in file name order
    query_dir: Option<PathBuf>,

    #[arg(long)]
    /// Skip properties decided by earlier traces and remove redundant traces
    optimize: bool,

    #[arg(long)]
    /// Check all queries in a single verifier invocation
    reuse_state_space: bool,

    #[arg(long, default_value = "60s")]
    /// Time limit for each query
    timeout: humantime::Duration,

    #[arg(long, default_value = "250ms")]
    /// How often a running query is checked on
    poll_interval: humantime::Duration,

    #[arg(long)]
    /// Map traces of derived components back to their original components
    back_annotate: bool,

    #[arg(long)]
    /// Drop a back-annotated trace entirely if any of it cannot be mapped
    strict_mapping: bool,

    #[arg(short, long)]
    /// Directory to write result and trace files to
    output: Option<PathBuf>,

    /// The model file handed to the verifier
    model: PathBuf,
}

impl VerifyArgs {
    fn options(&self) -> VerificationOptions {
        VerificationOptions {
            optimize: self.optimize,
            reuse_state_space: self.reuse_state_space,
            timeout: *self.timeout,
            poll_interval: *self.poll_interval,
            back_annotate: self.back_annotate,
            mapping: if self.strict_mapping {
                MappingPolicy::Strict
            } else {
                MappingPolicy::Lenient
            },
        }
    }

    fn packages(&self) -> Result<Vec<PropertyPackage>, String> {
        self.properties
            .iter()
            .map(|path| {
                let json = fs::read_to_string(path)
                    .map_err(|err| format!("could not read {}: {err}", path.display()))?;
                PropertyPackage::from_json(&json)
                    .map_err(|err| format!("could not parse {}: {err}", path.display()))
            })
            .collect()
    }

    /// The explicitly listed query files, followed by the query files of
    /// `--query-dir`.
    fn query_files(&self, extension: &str) -> Vec<PathBuf> {
        let mut files = self.queries.clone();
        if let Some(dir) = &self.query_dir {
            files.extend(query_files_in(dir, extension));
        }
        files
    }
}

/// Query files with the given extension under `dir`, sorted by file name.
fn query_files_in(dir: &Path, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension() == Some(OsStr::new(extension)))
        .map(|e| e.into_path())
        .collect()
}

#[derive(clap::Subcommand, Clone, Debug, PartialEq, Eq)]
enum Command {
    /// Check properties and query files against a model.
    Verify(VerifyArgs),
    /// Print the queries a property package is translated to.
    Print {
        #[command(flatten)]
        backend: BackendArgs,
        /// Property package (JSON)
        properties: PathBuf,
    },
    /// Check that the selected verifier adapter can be started.
    Check {
        #[command(flatten)]
        backend: BackendArgs,
    },
}

#[derive(clap::Parser, Debug)]
#[command(about, long_about=None)]
/// Entrypoint for the orchestrator binary, including all commands.
pub struct App {
    #[command(subcommand)]
    /// Command to run
    command: Command,
}

static INTERRUPTS: AtomicUsize = AtomicUsize::new(0);

extern "C" fn interrupt(_: nix::libc::c_int) {
    INTERRUPTS.fetch_add(1, Ordering::SeqCst);
}

fn wait_for_interrupts(count: usize) {
    while INTERRUPTS.load(Ordering::SeqCst) < count {
        thread::sleep(Duration::from_millis(50));
    }
}

/// Request cancellation of the run on SIGINT.
///
/// Verifiers run in their own process group and do not see the terminal's
/// SIGINT. The run kills the verifier it is waiting for at its next poll, so
/// a second SIGINT only exits the process after `grace`, by which time the
/// verifier is gone.
fn cancel_on_interrupt(cancel: &CancelFlag, grace: Duration) {
    let action = SigAction::new(
        SigHandler::Handler(interrupt),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: the handler only updates an atomic
    if let Err(err) = unsafe { signal::sigaction(Signal::SIGINT, &action) } {
        log::warn!("could not install interrupt handler: {err}");
        return;
    }
    let cancel = cancel.clone();
    thread::spawn(move || {
        wait_for_interrupts(1);
        log::info!("interrupted, cancelling verification");
        cancel.cancel();
        wait_for_interrupts(2);
        log::warn!("interrupted again, exiting");
        thread::sleep(grace);
        process::exit(130);
    });
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("{msg}");
    process::exit(1)
}

fn print_report(report: &RunReport) {
    for sentence in report.sentences() {
        println!("{sentence}");
    }
    for covered in &report.covered {
        let name = covered
            .label
            .clone()
            .unwrap_or_else(|| covered.formula.to_string());
        println!("{name}: {} (covered by an earlier trace)", covered.result);
    }
    for err in &report.mapping_errors {
        eprintln!("warning: {err}");
    }
}

impl App {
    /// Run the application.
    pub fn exec(self) {
        match self.command {
            Command::Verify(args) => {
                let conf = args.backend.conf().unwrap_or_else(|err| fail(err));
                let backend_type = conf
                    .backend_type()
                    .unwrap_or_else(|err: BackendError| fail(err));
                let packages = args.packages().unwrap_or_else(|err| fail(err));
                let queries = args.query_files(backend_type.query_extension());
                let cancel = CancelFlag::new();
                cancel_on_interrupt(&cancel, *args.poll_interval * 2);
                let report = match run_with_conf(
                    &args.model,
                    &packages,
                    &queries,
                    &args.options(),
                    &conf,
                    &cancel,
                ) {
                    Ok(report) => report,
                    Err(err) => fail(err),
                };
                print_report(&report);
                if let Some(dir) = &args.output {
                    match ArtifactWriter::new(dir).write_report(&report) {
                        Ok(paths) => {
                            for path in paths {
                                log::info!("wrote {}", path.display());
                            }
                        }
                        Err(err) => fail(format!("could not write to {}: {err}", dir.display())),
                    }
                }
                if report.cancelled {
                    process::exit(130);
                }
            }
            Command::Print {
                backend,
                properties,
            } => {
                let conf = backend.conf().unwrap_or_else(|err| fail(err));
                let backend = conf.backend().unwrap_or_else(|err| fail(err));
                let json = fs::read_to_string(&properties).unwrap_or_else(|err| {
                    fail(format!("could not read {}: {err}", properties.display()))
                });
                let package = PropertyPackage::from_json(&json).unwrap_or_else(|err| {
                    fail(format!("could not parse {}: {err}", properties.display()))
                });
                for f in &package.formulas {
                    if let Some(comment) = &f.comment {
                        println!("/* {comment} */");
                    }
                    match backend.serialize(&f.formula) {
                        Ok(query) => println!("{query}"),
                        Err(err) => println!("// {err}"),
                    }
                }
            }
            Command::Check { backend } => {
                let conf = backend.conf().unwrap_or_else(|err| fail(err));
                let backend = conf.backend().unwrap_or_else(|err| fail(err));
                match backend.health_check() {
                    Ok(()) => println!("{} backend is available", backend.name()),
                    Err(err) => fail(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn verify_args(args: &[&str]) -> VerifyArgs {
        let app = App::try_parse_from(["orchestrator", "verify"].iter().chain(args)).unwrap();
        match app.command {
            Command::Verify(args) => args,
            command => panic!("unexpected command {command:?}"),
        }
    }

    #[test]
    fn test_defaults() {
        let args = verify_args(&["model.xml"]);
        assert_eq!(args.model, PathBuf::from("model.xml"));
        assert_eq!(args.backend.languages, vec![Language::Uppaal]);
        assert_eq!(args.options(), VerificationOptions::default());
        let conf = args.backend.conf().unwrap();
        assert_eq!(conf.backend_type().unwrap(), BackendType::Uppaal);
        assert!(conf.adapter.is_none());
    }

    #[test]
    fn test_options() {
        let args = verify_args(&[
            "--optimize",
            "--reuse-state-space",
            "--timeout=2m",
            "--poll-interval=50ms",
            "--back-annotate",
            "--strict-mapping",
            "-l",
            "xsts-uppaal",
            "-p",
            "a.json",
            "--properties=b.json",
            "model.xml",
        ]);
        let options = args.options();
        assert!(options.optimize && options.reuse_state_space && options.back_annotate);
        assert_eq!(options.timeout, Duration::from_secs(120));
        assert_eq!(options.poll_interval, Duration::from_millis(50));
        assert_eq!(options.mapping, MappingPolicy::Strict);
        assert_eq!(args.properties.len(), 2);
        assert_eq!(
            args.backend.conf().unwrap().backend_type().unwrap(),
            BackendType::XstsUppaal
        );
    }

    #[test]
    fn test_adapter() {
        let args = verify_args(&[
            "--adapter=/opt/uppaal/adapter",
            "--adapter-arg=--model={model}",
            "--adapter-arg={query}",
            "model.xml",
        ]);
        let adapter = args.backend.conf().unwrap().adapter.unwrap();
        assert_eq!(adapter.cmd, "/opt/uppaal/adapter");
        assert_eq!(adapter.args, vec!["--model={model}", "{query}"]);
    }

    #[test]
    fn test_two_languages() {
        let args = verify_args(&["-l", "uppaal", "-l", "theta", "model.xml"]);
        let err = args.backend.conf().unwrap().backend_type().unwrap_err();
        insta::assert_display_snapshot!(err, @"invalid backend configuration: exactly one analysis language must be selected, got UPPAAL, Theta");
    }

    #[test]
    fn test_query_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["b.q", "a.q", "nested/c.q", "notes.txt", "d.prop"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        let names = |ext| {
            query_files_in(dir.path(), ext)
                .iter()
                .map(|p| {
                    p.strip_prefix(dir.path())
                        .unwrap()
                        .to_string_lossy()
                        .into_owned()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(names("q"), vec!["a.q", "b.q", "nested/c.q"]);
        assert_eq!(names("prop"), vec!["d.prop"]);

        let query_dir = format!("--query-dir={}", dir.path().display());
        let args = verify_args(&["-q", "first.q", &query_dir, "model.xml"]);
        let files = args.query_files("q");
        assert_eq!(files.len(), 4);
        assert_eq!(files[0], PathBuf::from("first.q"));
    }
}
