//! Error types for the PagerDuty MCP server.
//!
//! Three layers, matching where a failure is detected:
//! - [`ServerError`]: startup, composition and transport failures.
//! - [`GatewayError`]: a single backend HTTP exchange went wrong.
//! - [`ToolError`]: a tool call failed; its `Display` is the message the
//!   calling agent sees in the tool-level failure payload.

use thiserror::Error;

/// Errors raised while composing the catalog or running a transport.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Two catalog entries share a name
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    /// A tool name does not follow the `verb_noun` convention
    #[error("invalid tool name '{0}': {1}")]
    InvalidToolName(String, String),

    /// Invalid configuration value
    #[error("invalid config '{0}': {1}")]
    InvalidConfig(String, String),

    /// Reading or parsing a config file failed
    #[error("failed to load config file {0}: {1}")]
    ConfigFile(String, String),

    /// Backend client could not be constructed
    #[error("gateway initialization failed: {0}")]
    Gateway(#[from] GatewayError),

    /// Transport front door failed
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors raised by the backend gateway for a single request.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The backend answered with a status >= 400
    #[error("API error (status {status}): {body}")]
    Backend { status: u16, body: String },

    /// DNS, connect, timeout or read failure
    #[error("request failed: {0}")]
    Transport(String),

    /// The inbound request was cancelled while the call was in flight
    #[error("request cancelled")]
    Cancelled,

    /// Request body could not be serialized
    #[error("failed to marshal request: {0}")]
    Encode(String),

    /// Response body was not the JSON shape the caller expected
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// No credential available for the call
    #[error("no PagerDuty API credential configured")]
    MissingCredential,
}

/// Tool-level failure surfaced to the caller as an error result.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Required argument absent or empty
    #[error("{0} is required")]
    MissingArgument(String),

    /// Argument present with the wrong JSON type
    #[error("{0} must be a {1}")]
    WrongType(String, &'static str),

    /// Argument present but unusable (e.g. malformed embedded JSON)
    #[error("invalid {0}: {1}")]
    InvalidArgument(String, String),

    /// Backend state does not allow the operation
    #[error("{0}")]
    Precondition(String),

    /// Gateway failure, passed through verbatim
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Errors from an [`crate::server::auth::Authorizer`] that could not reach a verdict.
#[derive(Error, Debug)]
pub enum AuthorizerError {
    /// The delegate service could not be reached
    #[error("authorizer unreachable: {0}")]
    Unreachable(String),

    /// The delegate service answered with an unexpected status
    #[error("authorizer returned unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// Result type alias for startup and transport operations
pub type Result<T> = std::result::Result<T, ServerError>;
