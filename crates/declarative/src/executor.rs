//! Execution engine - issues writes one at a time and records what happened
//!
//! Writes are strictly sequential: later steps often depend on identifiers
//! returned by earlier ones. A failed step is logged and recorded but never
//! aborts the run.

use crate::context::ProgressCallback;
use crate::diff::ResourceDiff;
use crate::types::{ApplyResult, ExecuteOptions, ExecuteSummary};
use std::fmt;
use std::thread;

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    /// The write was issued and succeeded
    Applied(T),
    /// Dry run: the write was only recorded
    Planned,
    /// The write was issued and failed, or was refused locally
    Failed,
}

impl<T> Step<T> {
    /// Value returned by a successful write
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Planned | Self::Failed => None,
        }
    }

    /// Check if the step failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// A recorded step: what was attempted and how it ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub diff: ResourceDiff,
    pub result: ApplyResult,
}

/// Everything an executor did
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Steps in the order they ran
    pub steps: Vec<StepRecord>,
    /// Counts per result
    pub summary: ExecuteSummary,
}

impl Report {
    /// Diffs of all recorded steps
    pub fn diffs(&self) -> Vec<ResourceDiff> {
        self.steps.iter().map(|s| s.diff.clone()).collect()
    }

    /// Steps that failed
    pub fn failures(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| !s.result.is_success())
    }
}

/// Sequential, paced executor
///
/// # Example
///
/// ```
/// use declarative::{Change, ExecuteOptions, Executor, NoProgress, ResourceDiff};
///
/// let diff = ResourceDiff {
///     resource_id: "web".into(),
///     resource_type: "group".into(),
///     description: "Group web".into(),
///     change: Change::Create,
///     detail: None,
/// };
///
/// let mut progress = NoProgress;
/// let mut executor = Executor::new(ExecuteOptions::default(), &mut progress);
/// let id = executor.apply(diff, || Ok::<_, String>("42".to_string())).applied();
/// assert_eq!(id.as_deref(), Some("42"));
///
/// let report = executor.finish();
/// assert_eq!(report.summary.created, 1);
/// ```
pub struct Executor<'a> {
    opts: ExecuteOptions,
    progress: &'a mut dyn ProgressCallback,
    report: Report,
}

impl<'a> Executor<'a> {
    /// Create an executor
    pub fn new(opts: ExecuteOptions, progress: &'a mut dyn ProgressCallback) -> Self {
        Self {
            opts,
            progress,
            report: Report::default(),
        }
    }

    /// Whether writes are only recorded
    pub fn is_dry_run(&self) -> bool {
        self.opts.dry_run
    }

    /// Run one write described by `diff`
    ///
    /// In a dry run `op` is not called. Otherwise its error is logged and
    /// recorded, and the configured delay follows the call either way.
    pub fn apply<T, E, F>(&mut self, diff: ResourceDiff, op: F) -> Step<T>
    where
        E: fmt::Display,
        F: FnOnce() -> Result<T, E>,
    {
        self.progress.on_resource_start(&diff);

        if self.opts.dry_run {
            self.record(
                diff,
                ApplyResult::Skipped {
                    reason: "dry run".to_string(),
                },
            );
            return Step::Planned;
        }

        log::debug!(
            "{} {} {}",
            diff.change,
            diff.resource_type,
            diff.resource_id
        );
        let outcome = op();
        if !self.opts.delay.is_zero() {
            thread::sleep(self.opts.delay);
        }

        match outcome {
            Ok(value) => {
                let result = ApplyResult::for_change(diff.change);
                self.record(diff, result);
                Step::Applied(value)
            }
            Err(e) => {
                log::warn!(
                    "Failed to {} {} '{}': {}",
                    diff.change,
                    diff.resource_type,
                    diff.resource_id,
                    e
                );
                self.record(
                    diff,
                    ApplyResult::Failed {
                        error: e.to_string(),
                    },
                );
                Step::Failed
            }
        }
    }

    /// Refuse a step locally without calling anything
    pub fn skip(&mut self, diff: ResourceDiff, reason: impl Into<String>) -> Step<()> {
        let reason = reason.into();
        log::warn!(
            "Skipping {} of {} '{}': {}",
            diff.change,
            diff.resource_type,
            diff.resource_id,
            reason
        );
        self.progress.on_resource_start(&diff);
        self.record(diff, ApplyResult::Skipped { reason });
        Step::Failed
    }

    /// Count a resource that already matches
    pub fn unchanged(&mut self, resource_type: &str, resource_id: &str) {
        log::debug!("{resource_type} '{resource_id}' unchanged");
        self.report.summary.add_result(&ApplyResult::NoChange);
    }

    /// Summary so far
    pub fn summary(&self) -> &ExecuteSummary {
        &self.report.summary
    }

    /// Consume the executor, returning its report
    pub fn finish(self) -> Report {
        self.report
    }

    fn record(&mut self, diff: ResourceDiff, result: ApplyResult) {
        self.progress.on_resource_complete(&diff, &result);
        self.report.summary.add_result(&result);
        self.report.steps.push(StepRecord { diff, result });
    }
}
