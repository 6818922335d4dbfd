//! Resource-operation lifecycle layer.
//!
//! Everything a command needs to read or mutate resources that are
//! partitioned across zones, regions, or the global namespace:
//!
//! - [`scope`] - scope model and per-invocation scope resolution
//! - [`collector`] - paginated listing merged across a scope set
//! - [`poller`] - driving an asynchronous backend operation to a terminal state
//! - [`batch`] - bounded fan-out of mutating calls with per-target outcomes
//! - [`error`] - the error taxonomy shared by all of the above
//!
//! The layer talks to the backend only through caller-supplied closures
//! returning typed pages and operation observations, so the command
//! adapter decides which API client (or test double) sits underneath.

pub mod batch;
pub mod collector;
pub mod error;
pub mod poller;
pub mod scope;

pub use batch::{execute_batch, BatchOptions, BatchResult, Outcome};
pub use collector::{collect, CollectMode, CollectOutput, ListPage};
pub use error::OpsError;
pub use poller::{poll_to_completion, OperationData, OperationHandle, OperationStatus, PollConfig};
pub use scope::{resolve_scopes, ResourceRef, Scope, ScopeKind, ScopeSet};
