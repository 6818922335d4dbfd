//! Error taxonomy for the resource-operation lifecycle layer.

use super::scope::{Scope, ScopeKind};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// A single scope whose listing failed during collection.
#[derive(Debug)]
pub struct ScopeFailure {
    pub scope: Scope,
    pub cause: Box<OpsError>,
}

/// Errors produced by the lifecycle core.
///
/// Per-target failures are folded into a `BatchResult` and never abort
/// sibling targets; resolver and strict-mode collection failures are fatal
/// to the whole invocation.
#[derive(Debug, Error)]
pub enum OpsError {
    #[error("no {0}s available for this project")]
    NoScopes(ScopeKind),

    #[error("unknown {kind} \"{scope}\"")]
    UnknownScope { kind: ScopeKind, scope: String },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("transport failure: {0}")]
    Transport(anyhow::Error),

    #[error("operation {operation} unreachable after {faults} consecutive transport faults")]
    PollingUnreachable { operation: String, faults: u32 },

    #[error("timed out after {waited:?} waiting for operation {operation}")]
    Timeout { operation: String, waited: Duration },

    #[error("operation {operation} failed: {code}: {message}")]
    BackendOperation {
        operation: String,
        code: String,
        message: String,
    },

    #[error("listing failed in {} scope(s)", .failures.len())]
    Collect {
        failures: Vec<ScopeFailure>,
        /// Items gathered from the scopes that did succeed. Never discarded.
        partial: Vec<Value>,
    },

    #[error("interrupted")]
    Interrupted,
}

impl OpsError {
    /// Wrap a collaborator error as a transport fault.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        OpsError::Transport(err.into())
    }

    /// True for faults of the transport layer, the only kind the poller
    /// tolerates (up to its consecutive-fault budget).
    pub fn is_transport(&self) -> bool {
        matches!(self, OpsError::Transport(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OpsError::NotFound { .. })
    }
}
