//! The shared per-candidate pipeline and the outcome record it produces.
//!
//! validate → measure → gate → lock check → act → measure. Each resource
//! kind only supplies the capabilities in [`ResourceHandler`]; duration
//! recording and fail-safe lock gating live here, once.

use crate::error::SweepError;
use crate::kind::ResourceKind;
use crate::utils;
use serde::{Serialize, Serializer};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Terminal state of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Skipped,
    Error,
}

/// Destructive steps, recorded as each one completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTag {
    RemoveGarbagePacks,
    RemotePrune,
    Gc,
    ClearLogs,
    ClearHistory,
    ClearSnapshots,
    ClearCaches,
    TestAndRepair,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStats {
    pub logs_cleared: usize,
    pub history_cleared: usize,
    pub snapshots_cleared: usize,
    pub caches_cleared: usize,
}

impl WorkspaceStats {
    pub fn total(&self) -> usize {
        self.logs_cleared + self.history_cleared + self.snapshots_cleared + self.caches_cleared
    }
}

/// Kind-specific fields, flattened into the outcome in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutcomeDetails {
    #[serde(rename_all = "camelCase")]
    Repository {
        #[serde(serialize_with = "as_gb")]
        garbage_before: u64,
        #[serde(serialize_with = "as_gb")]
        garbage_after: u64,
        garbage_packs_removed: usize,
    },
    #[serde(rename_all = "camelCase")]
    Workspace {
        files_deleted: usize,
        details: WorkspaceStats,
    },
    Database { platform: String },
}

/// Immutable result of processing one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub path: PathBuf,
    #[serde(serialize_with = "as_gb")]
    pub size_before: u64,
    #[serde(serialize_with = "opt_as_gb")]
    pub size_after: Option<u64>,
    #[serde(serialize_with = "signed_as_gb")]
    pub space_saved: i64,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    pub status: Status,
    #[serde(rename = "actions")]
    pub actions_performed: Vec<ActionTag>,
    pub errors: Vec<String>,
    #[serde(flatten)]
    pub details: OutcomeDetails,
}

impl Outcome {
    /// Space saved as counted by the report: only successes contribute.
    pub fn counted_savings(&self) -> i64 {
        match self.status {
            Status::Success => self.space_saved,
            Status::Skipped | Status::Error => 0,
        }
    }
}

/// Mutable scratch state an action step fills in. Actions are appended as
/// each sub-step completes, so a later failure keeps earlier entries.
#[derive(Debug)]
pub struct ActionLog {
    pub actions: Vec<ActionTag>,
    pub errors: Vec<String>,
    pub details: OutcomeDetails,
}

impl ActionLog {
    pub fn record(&mut self, action: ActionTag) {
        self.actions.push(action);
    }

    /// A failed sub-step that does not end processing of the candidate.
    pub fn note(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// Capabilities one resource kind plugs into the shared pipeline.
pub trait ResourceHandler {
    fn kind(&self) -> ResourceKind;

    /// Gate threshold in bytes.
    fn threshold_bytes(&self) -> u64;

    /// Section-level precondition checked once before any candidate is
    /// processed (tool available, platform installed). `Err` carries the
    /// diagnostic and aborts the whole sweep of this kind.
    fn prepare(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Candidates in deterministic order.
    fn candidates(&self) -> Vec<PathBuf>;

    /// `Some(reason)` when the candidate is in use or not writable.
    fn lock_reason(&self, candidate: &Path) -> Option<String>;

    /// Fresh kind-specific detail fields.
    fn initial_details(&self) -> OutcomeDetails;

    /// The destructive step. `Err` is terminal for the candidate.
    fn act(&self, candidate: &Path, log: &mut ActionLog) -> Result<(), SweepError>;
}

/// Run one candidate through the pipeline. Never fails: every exit path,
/// a panic in the handler included, yields an outcome with its duration
/// recorded.
pub fn process_candidate<H: ResourceHandler + ?Sized>(handler: &H, candidate: &Path) -> Outcome {
    let started = Instant::now();
    let kind = handler.kind();
    let mut outcome = Outcome {
        path: candidate.to_path_buf(),
        size_before: 0,
        size_after: None,
        space_saved: 0,
        duration_seconds: 0.0,
        status: Status::Error,
        actions_performed: Vec::new(),
        errors: Vec::new(),
        details: handler.initial_details(),
    };

    let steps = panic::catch_unwind(AssertUnwindSafe(|| {
        run_steps(handler, kind, candidate, &mut outcome)
    }));
    if let Err(payload) = steps {
        let err = SweepError::Unexpected(panic_message(payload.as_ref()));
        tracing::error!(kind = %kind, path = %candidate.display(), error = %err, "candidate processing panicked");
        outcome.status = Status::Error;
        outcome.size_after = None;
        outcome.space_saved = 0;
        outcome.errors.push(err.to_string());
    }

    outcome.duration_seconds = started.elapsed().as_secs_f64();
    tracing::info!(
        kind = %kind,
        path = %candidate.display(),
        status = ?outcome.status,
        saved = outcome.space_saved,
        duration = outcome.duration_seconds,
        "candidate processed"
    );
    outcome
}

fn run_steps<H: ResourceHandler + ?Sized>(
    handler: &H,
    kind: ResourceKind,
    candidate: &Path,
    outcome: &mut Outcome,
) {
    if !kind.matches(candidate) {
        outcome.errors.push(kind.invalid_message().to_string());
        return;
    }

    outcome.size_before = utils::entry_size(candidate);

    let threshold = handler.threshold_bytes();
    if outcome.size_before < threshold {
        tracing::debug!(path = %candidate.display(), size = outcome.size_before, threshold, "below threshold");
        outcome.status = Status::Skipped;
        outcome.size_after = Some(outcome.size_before);
        outcome.errors.push(format!(
            "Size {} GB below threshold {} GB",
            utils::format_gb(outcome.size_before as i64),
            utils::format_gb(threshold as i64)
        ));
        return;
    }

    if let Some(reason) = handler.lock_reason(candidate) {
        let err = SweepError::Lock(reason);
        tracing::warn!(path = %candidate.display(), error = %err, "candidate locked");
        outcome.errors.push(err.to_string());
        return;
    }

    let mut log = ActionLog {
        actions: Vec::new(),
        errors: Vec::new(),
        details: std::mem::replace(&mut outcome.details, handler.initial_details()),
    };
    // The log stays outside the unwind boundary so recorded actions survive.
    let result = panic::catch_unwind(AssertUnwindSafe(|| handler.act(candidate, &mut log)))
        .unwrap_or_else(|payload| Err(SweepError::Unexpected(panic_message(payload.as_ref()))));
    outcome.actions_performed = log.actions;
    outcome.errors = log.errors;
    outcome.details = log.details;

    if let Err(e) = result {
        tracing::warn!(path = %candidate.display(), error = %e, "action failed");
        outcome.errors.push(e.to_string());
        return;
    }

    let after = utils::entry_size(candidate);
    outcome.size_after = Some(after);
    outcome.space_saved = outcome.size_before as i64 - after as i64;
    outcome.status = Status::Success;
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

fn as_gb<S: Serializer>(bytes: &u64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(utils::bytes_to_gb(*bytes as i64))
}

fn signed_as_gb<S: Serializer>(bytes: &i64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(utils::bytes_to_gb(*bytes))
}

fn opt_as_gb<S: Serializer>(bytes: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
    match bytes {
        Some(b) => as_gb(b, s),
        None => s.serialize_none(),
    }
}
