//! cloudctl - command-line front end for Compute Engine style
//! control-plane APIs.
//!
//! The interesting machinery is the lifecycle layer in [`ops`]: resolving
//! which zones/regions an invocation touches, merging paginated list
//! results across them, and driving batches of asynchronous backend
//! operations to terminal states with per-target outcome reporting.
//! [`gcp`] is the wire-level collaborator, [`resource`] the data-driven
//! registry of resource types, and [`commands`] the adapter binding the
//! three together for each subcommand.

pub mod commands;
pub mod config;
pub mod gcp;
pub mod ops;
pub mod output;
pub mod resource;
