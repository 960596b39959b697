// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Check the properties of a run one at a time.
//!
//! The processor drains the worklist from a single thread, with one verifier
//! invocation in flight at a time. Each invocation is polled, so the processor
//! notices cancellation and enforces the timeout without relying on the
//! verifier to stop by itself. A query that times out, fails or cannot be
//! expressed is recorded as undefined and the run goes on.

use crate::{
    annotate::BackAnnotator,
    conf::{CancelFlag, MappingPolicy, VerificationOptions},
    dedup,
    error::{QueryFailure, RunError},
    reduce,
    report::{CoveredRecord, QueryKind, RunReport, VerificationRecord},
    worklist::{WorkItem, Worklist},
};
use backend::{
    conf::BackendConf,
    imp::{Backend, BackendError, Outcome},
    query::{self, QueryLine},
    verifier::VerifierHandle,
};
use model::{result::ThreeStateBoolean, syntax::PropertyPackage, trace::ExecutionTrace};
use runner::run::PollOutcome;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// The states of a [`QueueProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// Checking properties from the worklist
    Running,
    /// The worklist is done; checking raw queries
    Draining,
    /// Cancellation was requested; nothing more is dispatched
    Cancelled,
    /// Everything was checked
    Finished,
}

/// Drains a worklist of properties against one backend.
#[derive(Debug)]
pub struct QueueProcessor<'a> {
    model: &'a Path,
    backend: Arc<dyn Backend>,
    options: &'a VerificationOptions,
    cancel: CancelFlag,
    state: ProcessorState,
    worklist: Worklist,
    report: RunReport,
}

impl<'a> QueueProcessor<'a> {
    /// A processor for the properties in `worklist`.
    pub fn new(
        model: &'a Path,
        backend: Arc<dyn Backend>,
        options: &'a VerificationOptions,
        cancel: CancelFlag,
        worklist: Worklist,
    ) -> Self {
        Self {
            model,
            backend,
            options,
            cancel,
            state: ProcessorState::Running,
            worklist,
            report: RunReport::default(),
        }
    }

    #[allow(missing_docs)]
    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// Move to the cancelled state if cancellation was requested.
    fn observe_cancel(&mut self) -> bool {
        if self.cancel.is_cancelled() && self.state != ProcessorState::Finished {
            if self.state != ProcessorState::Cancelled {
                log::info!("Verification cancelled");
            }
            self.state = ProcessorState::Cancelled;
        }
        self.state == ProcessorState::Cancelled
    }

    /// Run one query to completion, timeout or cancellation. The query file is
    /// removed and the verifier killed (if still running) before returning.
    fn dispatch(&mut self, query: &str) -> Result<Outcome, QueryFailure> {
        log::info!("Checking {query}...");
        let handle = VerifierHandle::start(self.backend.clone(), self.model, query)
            .map_err(|err| QueryFailure::Execution(err.to_string()))?;
        let cancel = self.cancel.clone();
        let outcome = match handle.poll(&self.options.schedule(), || cancel.is_cancelled()) {
            PollOutcome::Done => match handle.result() {
                Some(Ok(outcome)) if outcome.result.is_decided() => Ok(outcome),
                Some(Ok(_)) => Err(QueryFailure::Execution(
                    "the verifier completed without deciding the query".to_string(),
                )),
                Some(Err(BackendError::Killed)) => Err(QueryFailure::Cancelled),
                Some(Err(err)) => Err(QueryFailure::Execution(err.to_string())),
                None => Err(QueryFailure::Execution(
                    "the verifier run ended without a result".to_string(),
                )),
            },
            PollOutcome::TimedOut => {
                log::info!("Timeout...");
                handle.cancel(true);
                Err(QueryFailure::Timeout)
            }
            PollOutcome::Interrupted => {
                handle.cancel(true);
                Err(QueryFailure::Cancelled)
            }
        };
        if let Err(QueryFailure::Execution(msg)) = &outcome {
            log::warn!("query {query} failed: {msg}");
        }
        if let Err(QueryFailure::Cancelled) = &outcome {
            self.observe_cancel();
        }
        outcome
    }

    /// Add a trace to the report, unless it witnesses nothing new.
    fn retain(&mut self, trace: ExecutionTrace) {
        let mut trace = trace;
        if self.options.optimize {
            if dedup::is_covered_by_any(&trace, &self.report.traces) {
                log::info!("Trace is already covered");
                return;
            }
            trace = dedup::remove_covered_steps(trace);
        }
        if !trace.is_empty() {
            self.report.traces.push(trace);
        }
    }

    fn record(&mut self, record: VerificationRecord) {
        log::debug!("{}", record.sentence());
        self.report.results.push(record);
    }

    /// Remove the properties that `trace` decides from the worklist.
    fn reduce(&mut self, trace: &ExecutionTrace) {
        let covered = reduce::covered(trace, self.worklist.iter());
        if covered.is_empty() {
            return;
        }
        let ids = covered.keys().copied().collect();
        for item in self.worklist.remove_ids(&ids) {
            log::info!("Property already covered: {}", item.formula);
            self.report.covered.push(CoveredRecord {
                result: covered[&item.id],
                formula: item.formula,
                label: item.comment,
            });
        }
    }

    fn check_item(&mut self, item: WorkItem) {
        let query = match self.backend.serialize(&item.formula) {
            Ok(query) => query,
            Err(err) => {
                log::warn!("{err}");
                self.record(VerificationRecord {
                    kind: QueryKind::Formula,
                    query: item.formula.to_string(),
                    formula: Some(item.formula),
                    label: item.comment,
                    result: ThreeStateBoolean::Undef,
                    failure: Some(QueryFailure::Unsupported(err.to_string())),
                });
                return;
            }
        };
        let outcome = self.dispatch(&query);
        let (result, failure, trace) = match outcome {
            Ok(outcome) => (outcome.result, None, outcome.trace),
            Err(failure) => (ThreeStateBoolean::Undef, Some(failure), None),
        };
        self.record(VerificationRecord {
            kind: QueryKind::Formula,
            query,
            formula: Some(item.formula),
            label: item.comment,
            result,
            failure,
        });
        if let Some(trace) = trace {
            if self.options.optimize && !trace.is_empty() {
                self.reduce(&trace);
            }
            self.retain(trace);
        }
    }

    fn check_raw(&mut self, line: QueryLine) {
        let outcome = self.dispatch(&line.query);
        let (result, failure, trace) = match outcome {
            Ok(outcome) => (outcome.result, None, outcome.trace),
            Err(failure) => (ThreeStateBoolean::Undef, Some(failure), None),
        };
        self.record(VerificationRecord {
            kind: QueryKind::Raw,
            query: line.query,
            formula: None,
            label: line.label,
            result,
            failure,
        });
        if let Some(trace) = trace {
            self.retain(trace);
        }
    }

    /// Check every remaining property and raw query in one invocation.
    fn check_batch(&mut self, raw: Vec<QueryLine>) {
        let mut queries = vec![];
        for item in self.worklist.drain() {
            match self.backend.serialize(&item.formula) {
                Ok(query) => queries.push(query),
                Err(err) => {
                    log::warn!("{err}");
                    self.record(VerificationRecord {
                        kind: QueryKind::Formula,
                        query: item.formula.to_string(),
                        formula: Some(item.formula),
                        label: item.comment,
                        result: ThreeStateBoolean::Undef,
                        failure: Some(QueryFailure::Unsupported(err.to_string())),
                    });
                }
            }
        }
        queries.extend(raw.into_iter().map(|line| line.query));
        if queries.is_empty() {
            return;
        }
        let combined = query::combine(&queries);
        let outcome = self.dispatch(&combined);
        let (result, failure, trace) = match outcome {
            Ok(outcome) => (outcome.result, None, outcome.trace),
            Err(failure) => (ThreeStateBoolean::Undef, Some(failure), None),
        };
        self.record(VerificationRecord {
            kind: QueryKind::Batch,
            query: combined,
            formula: None,
            label: None,
            result,
            failure,
        });
        if let Some(trace) = trace {
            self.retain(trace);
        }
    }

    /// Post-process the traces of the run.
    fn finish_traces(&mut self) {
        let traces = std::mem::take(&mut self.report.traces);
        let traces = if self.options.optimize {
            dedup::remove_covered_traces(traces)
        } else {
            traces
        };
        if !self.options.back_annotate {
            self.report.traces = traces;
            return;
        }
        let annotator = BackAnnotator::new(self.options.mapping);
        for trace in traces {
            match annotator.annotate(&trace) {
                Ok(annotation) => {
                    self.report.mapping_errors.extend(annotation.dropped);
                    self.report.traces.push(annotation.trace);
                }
                Err(err) => {
                    log::warn!("could not back-annotate trace: {err}");
                    self.report.mapping_errors.push(err);
                    if self.options.mapping == MappingPolicy::Lenient {
                        self.report.traces.push(trace);
                    }
                }
            }
        }
    }

    /// Check all properties, then the raw queries, and return the report.
    pub fn run(mut self, raw: Vec<QueryLine>) -> RunReport {
        if self.options.reuse_state_space {
            if !self.observe_cancel() {
                self.check_batch(raw);
            }
        } else {
            while !self.observe_cancel() {
                let Some(item) = self.worklist.pop_front() else {
                    break;
                };
                self.check_item(item);
            }
            if self.state == ProcessorState::Running {
                self.state = ProcessorState::Draining;
                for line in raw {
                    if self.observe_cancel() {
                        break;
                    }
                    self.check_raw(line);
                }
            }
        }
        if self.state != ProcessorState::Cancelled {
            self.state = ProcessorState::Finished;
        }
        self.finish_traces();
        self.report.cancelled = self.state == ProcessorState::Cancelled;
        self.report
    }
}

fn load_queries(paths: &[PathBuf]) -> Result<Vec<QueryLine>, RunError> {
    let mut queries = vec![];
    for path in paths {
        let lines = query::read_queries(path).map_err(|err| RunError::QueryFile {
            path: path.clone(),
            err,
        })?;
        queries.extend(lines);
    }
    Ok(queries)
}

/// Check the properties of `packages` and the queries of `raw_query_files`
/// against `model`.
///
/// Only an unavailable backend or malformed input aborts the run; failures of
/// individual queries are recorded in the report. A run cancelled through
/// `cancel` returns what it gathered so far.
pub fn run_verification(
    model: &Path,
    packages: &[PropertyPackage],
    raw_query_files: &[PathBuf],
    options: &VerificationOptions,
    backend: Arc<dyn Backend>,
    cancel: &CancelFlag,
) -> Result<RunReport, RunError> {
    if !model.is_file() {
        return Err(RunError::Config(format!(
            "model {} does not exist",
            model.display()
        )));
    }
    backend.health_check()?;
    let raw = load_queries(raw_query_files)?;
    let worklist = Worklist::from_packages(packages);
    log::info!(
        "verifying {} properties and {} raw queries with {}",
        worklist.len(),
        raw.len(),
        backend.name()
    );
    let processor = QueueProcessor::new(model, backend, options, cancel.clone(), worklist);
    Ok(processor.run(raw))
}

/// Like [`run_verification`], selecting the backend from `conf`.
pub fn run_with_conf(
    model: &Path,
    packages: &[PropertyPackage],
    raw_query_files: &[PathBuf],
    options: &VerificationOptions,
    conf: &BackendConf,
    cancel: &CancelFlag,
) -> Result<RunReport, RunError> {
    let backend = conf.backend()?;
    run_verification(model, packages, raw_query_files, options, backend, cancel)
}
