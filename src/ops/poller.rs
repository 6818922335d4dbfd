//! Operation polling.
//!
//! Mutating calls return an asynchronous backend operation; the poller
//! drives one operation to a terminal state with fixed-delay polling, a
//! bounded total wait, and a tolerance of up to three consecutive transport
//! faults. Timing out stops the local wait only - nothing is cancelled
//! upstream and the backend operation may still complete later.

use super::error::OpsError;
use super::scope::{ResourceRef, Scope};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default seconds between polls, matching the backend's tolerated rate.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default bound on the total wait for one operation.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(240);

/// Consecutive transport faults tolerated before the operation is declared
/// unreachable.
const MAX_CONSECUTIVE_FAULTS: u32 = 3;

/// Where an operation is in its life. Transitions are one-directional;
/// `Done` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
    Error,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationStatus::Done | OperationStatus::Error)
    }

    /// Parse a backend status string. Unknown values are treated as still
    /// in flight.
    pub fn parse(s: &str) -> Self {
        match s {
            "PENDING" => OperationStatus::Pending,
            "RUNNING" => OperationStatus::Running,
            "DONE" => OperationStatus::Done,
            other => {
                tracing::debug!("unrecognized operation status {:?}", other);
                OperationStatus::Running
            }
        }
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperationStatus::Pending => "PENDING",
            OperationStatus::Running => "RUNNING",
            OperationStatus::Done => "DONE",
            OperationStatus::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Backend-supplied cause attached to a terminally failed operation.
#[derive(Debug, Clone)]
pub struct OperationError {
    pub code: String,
    pub message: String,
}

/// One observation of an operation: the mutate response or a poll result.
#[derive(Debug, Clone)]
pub struct OperationData {
    pub name: String,
    pub status: OperationStatus,
    pub target_link: Option<String>,
    pub error: Option<OperationError>,
}

impl OperationData {
    pub fn in_flight(name: &str, status: OperationStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
            target_link: None,
            error: None,
        }
    }
}

/// Reference to an asynchronous backend operation. Owned by the poller
/// from creation until a terminal state is observed.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    pub operation: String,
    pub scope: Scope,
    pub target: ResourceRef,
}

/// Fixed-delay polling parameters.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Drive one operation to a terminal state.
///
/// `initial` is the observation returned by the mutating call itself - an
/// operation that completed synchronously never sleeps. `poll_fn` fetches a
/// fresh observation for the handle. Cancellation wakes any in-progress
/// sleep; a timeout returns `Timeout` without telling the backend anything.
pub async fn poll_to_completion<F, Fut>(
    handle: &OperationHandle,
    initial: OperationData,
    config: PollConfig,
    cancel: &CancellationToken,
    poll_fn: F,
) -> Result<OperationData, OpsError>
where
    F: Fn(OperationHandle) -> Fut,
    Fut: Future<Output = Result<OperationData, OpsError>>,
{
    let start = tokio::time::Instant::now();
    let mut current = initial;
    let mut consecutive_faults = 0u32;

    loop {
        if current.status.is_terminal() || current.error.is_some() {
            return finish(handle, current);
        }

        if start.elapsed() >= config.timeout {
            tracing::warn!(
                "operation {} still {:?} after {:?}; giving up the local wait",
                handle.operation,
                current.status,
                config.timeout
            );
            return Err(OpsError::Timeout {
                operation: handle.operation.clone(),
                waited: start.elapsed(),
            });
        }

        tracing::debug!(
            "waiting on {} for {}; sleeping {:?}",
            handle.operation,
            handle.target,
            config.interval
        );
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            _ = cancel.cancelled() => return Err(OpsError::Interrupted),
        }

        match poll_fn(handle.clone()).await {
            Ok(observed) => {
                consecutive_faults = 0;
                current = observed;
            }
            Err(err) if err.is_transport() => {
                consecutive_faults += 1;
                tracing::warn!(
                    "poll {}/{} for {} failed: {}",
                    consecutive_faults,
                    MAX_CONSECUTIVE_FAULTS,
                    handle.operation,
                    err
                );
                if consecutive_faults >= MAX_CONSECUTIVE_FAULTS {
                    return Err(OpsError::PollingUnreachable {
                        operation: handle.operation.clone(),
                        faults: consecutive_faults,
                    });
                }
            }
            // The operation vanished or the backend rejected the poll.
            Err(err) => return Err(err),
        }
    }
}

fn finish(handle: &OperationHandle, data: OperationData) -> Result<OperationData, OpsError> {
    if let Some(cause) = &data.error {
        return Err(OpsError::BackendOperation {
            operation: handle.operation.clone(),
            code: cause.code.clone(),
            message: cause.message.clone(),
        });
    }
    Ok(data)
}
