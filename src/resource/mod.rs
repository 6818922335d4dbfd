//! Resource abstraction layer
//!
//! A data-driven registry of the resource types the CLI can operate on.
//! Each type is declared in JSON (service, REST collection, scoping
//! dimension, table columns) and compiled into the binary, so new
//! resource types are added without code changes.

mod registry;

pub use registry::{get_all_resource_keys, get_resource, ColumnDef, ResourceDef};
