//! Control-plane API collaborator
//!
//! Everything that touches the wire lives here: authentication, the HTTP
//! wrapper, and the client that knows the REST layout of scoped
//! collections and operations. The lifecycle core under [`crate::ops`]
//! only ever sees this module through closures handed to it by the
//! command adapter.
//!
//! - [`auth`] - Application Default Credentials with token caching
//! - [`http`] - HTTP utilities and the typed wire-level error
//! - [`client`] - the API client and response decoding

pub mod auth;
pub mod client;
pub mod http;
