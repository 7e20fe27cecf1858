//! Transport front doors over the shared [`crate::dispatch::Dispatcher`].
//!
//! - `rpc`: JSON-RPC envelopes and method routing shared by both bindings
//! - `stdio`: newline-delimited JSON-RPC over stdin/stdout, one message at a time
//! - `auth`: pluggable authorizer and the HTTP authorization middleware
//! - `http`: axum router with `/health` and the JSON-RPC endpoint

pub mod auth;
pub mod http;
mod rpc;
pub mod stdio;

pub use auth::{AllowAll, Authorizer, RemoteAuthorizer};
pub use http::{router, serve_http};
pub use stdio::serve_stdio;
