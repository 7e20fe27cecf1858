//! PagerDuty MCP server.
//!
//! Exposes the PagerDuty REST API as MCP tools over stdio or HTTP. Read tools
//! are always available; write tools only when enabled at composition time.

pub mod catalog;
pub mod compose;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod server;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{Catalog, ToolDef, ToolSpec};
pub use compose::{compose, Policy};
pub use config::{ClientConfig, FileConfig};
pub use context::{CallContext, CredentialOverride};
pub use dispatch::Dispatcher;
pub use error::{AuthorizerError, GatewayError, Result, ServerError, ToolError};
pub use gateway::PagerDutyClient;
pub use server::{router, serve_http, serve_stdio, AllowAll, Authorizer, RemoteAuthorizer};
