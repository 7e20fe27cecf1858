//! Per-call ambient context: credential override and cancellation.
//!
//! A `CallContext` is built fresh for every inbound request by the transport
//! and threaded explicitly through dispatch, handler and gateway. It is never
//! stored anywhere that outlives the request.

use tokio_util::sync::CancellationToken;

/// Backend credential supplied by the caller for one request only.
///
/// Inserted into HTTP request extensions by the auth middleware.
#[derive(Clone)]
pub struct CredentialOverride(pub String);

impl std::fmt::Debug for CredentialOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialOverride(<redacted>)")
    }
}

/// Request-scoped overlay consulted by the gateway.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    credential: Option<CredentialOverride>,
    cancel: CancellationToken,
}

impl CallContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            credential: None,
            cancel,
        }
    }

    /// Attach a caller-supplied credential. Empty values are ignored.
    pub fn with_credential(mut self, credential: Option<CredentialOverride>) -> Self {
        self.credential = credential.filter(|c| !c.0.trim().is_empty());
        self
    }

    /// The override if present, else `default`.
    pub fn resolve_credential<'a>(&'a self, default: &'a str) -> &'a str {
        match &self.credential {
            Some(CredentialOverride(token)) => token,
            None => default,
        }
    }

    pub fn has_override(&self) -> bool {
        self.credential.is_some()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }
}
