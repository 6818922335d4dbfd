//! Batch execution of mutating calls.
//!
//! Fans out one mutating call per target under a bounded concurrency
//! limit, drives every resulting operation to a terminal state, and
//! aggregates per-target outcomes. There is no early abort: a failed
//! target never stops its siblings, and every submitted target gets an
//! outcome in the final result.

use super::error::OpsError;
use super::poller::{poll_to_completion, OperationData, OperationHandle, PollConfig};
use super::scope::ResourceRef;
use futures::stream::{self, StreamExt};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Default fan-out width. Raising it tends to run into backend rate
/// limits.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Upper bound accepted for the fan-out width.
pub const MAX_CONCURRENCY: usize = 20;

/// Final outcome for one target.
#[derive(Debug)]
pub enum Outcome {
    Succeeded,
    Failed(OpsError),
    Skipped(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// Per-target outcomes in original submission order. Immutable once the
/// batch completes; partial failures never erase sibling results.
#[derive(Debug, Default)]
pub struct BatchResult {
    entries: Vec<(ResourceRef, Outcome)>,
}

impl BatchResult {
    pub fn entries(&self) -> &[(ResourceRef, Outcome)] {
        &self.entries
    }

    pub fn outcome_for(&self, target: &ResourceRef) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == target)
            .map(|(_, outcome)| outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Succeeded))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|(_, o)| o.is_failure()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|(_, o)| o.is_failure())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Batch tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Concurrent in-flight targets; clamped to `1..=MAX_CONCURRENCY`.
    pub concurrency: usize,
    pub poll: PollConfig,
    /// When false, a target is done as soon as its mutating call is
    /// accepted; nothing is polled.
    pub wait: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            poll: PollConfig::default(),
            wait: true,
        }
    }
}

/// Issue `mutate_fn` for every target and poll each resulting operation to
/// completion.
///
/// A synchronous rejection (the mutating call itself fails, e.g. not
/// found) records `Failed` without an operation handle ever existing.
/// Cancellation stops new submissions and new polls; calls already on the
/// wire finish on their own. Outcomes are keyed by target and reported in
/// input order regardless of completion order.
pub async fn execute_batch<M, MFut, P, PFut>(
    targets: Vec<ResourceRef>,
    opts: &BatchOptions,
    cancel: &CancellationToken,
    mutate_fn: M,
    poll_fn: P,
) -> BatchResult
where
    M: Fn(ResourceRef) -> MFut,
    MFut: Future<Output = Result<OperationData, OpsError>>,
    P: Fn(OperationHandle) -> PFut,
    PFut: Future<Output = Result<OperationData, OpsError>>,
{
    let concurrency = opts.concurrency.clamp(1, MAX_CONCURRENCY);
    let mutate_fn = &mutate_fn;
    let poll_fn = &poll_fn;

    let mut completed: Vec<(usize, ResourceRef, Outcome)> =
        stream::iter(targets.into_iter().enumerate())
            .map(|(index, target)| async move {
                let outcome = run_target(target.clone(), opts, cancel, mutate_fn, poll_fn).await;
                (index, target, outcome)
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

    // Completion order is arbitrary; presentation order is input order.
    completed.sort_by_key(|(index, _, _)| *index);
    BatchResult {
        entries: completed
            .into_iter()
            .map(|(_, target, outcome)| (target, outcome))
            .collect(),
    }
}

async fn run_target<M, MFut, P, PFut>(
    target: ResourceRef,
    opts: &BatchOptions,
    cancel: &CancellationToken,
    mutate_fn: &M,
    poll_fn: &P,
) -> Outcome
where
    M: Fn(ResourceRef) -> MFut,
    MFut: Future<Output = Result<OperationData, OpsError>>,
    P: Fn(OperationHandle) -> PFut,
    PFut: Future<Output = Result<OperationData, OpsError>>,
{
    if cancel.is_cancelled() {
        return Outcome::Skipped("interrupted before submission".to_string());
    }

    let initial = match mutate_fn(target.clone()).await {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!("{} rejected: {}", target, err);
            return Outcome::Failed(err);
        }
    };

    let handle = OperationHandle {
        operation: initial.name.clone(),
        scope: target.scope.clone(),
        target: target.clone(),
    };

    if !opts.wait {
        if let Some(cause) = &initial.error {
            return Outcome::Failed(OpsError::BackendOperation {
                operation: handle.operation,
                code: cause.code.clone(),
                message: cause.message.clone(),
            });
        }
        tracing::info!("{} accepted as {}", target, handle.operation);
        return Outcome::Succeeded;
    }

    match poll_to_completion(&handle, initial, opts.poll, cancel, poll_fn).await {
        Ok(_) => Outcome::Succeeded,
        Err(err) => Outcome::Failed(err),
    }
}
