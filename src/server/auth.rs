//! HTTP authorization: the pluggable [`Authorizer`] and the middleware that
//! gates the JSON-RPC endpoint.
//!
//! The middleware answers in a fixed order:
//! 1. no (or blank) `Authorization` header: 401 "Authorization header required"
//! 2. authorizer could not decide: 500 "Authorization failed"
//! 3. authorizer said no: 401 "Unauthorized"
//! 4. otherwise the request proceeds, carrying `X-PagerDuty-Token` (if any)
//!    as its [`CredentialOverride`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::context::CredentialOverride;
use crate::error::{AuthorizerError, ServerError};

/// Header carrying a per-request PagerDuty credential.
pub const CREDENTIAL_HEADER: &str = "x-pagerduty-token";

/// Decides whether an `Authorization` header value may use the server.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// `Ok(false)` is a denial; `Err` means no verdict could be reached.
    async fn authorize(&self, authorization: &str) -> Result<bool, AuthorizerError>;
}

/// Accepts any non-empty header. Development default.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, authorization: &str) -> Result<bool, AuthorizerError> {
        Ok(!authorization.trim().is_empty())
    }
}

/// Delegates the decision to an external service.
///
/// Sends `GET <url>` with the caller's `Authorization` header: 2xx allows,
/// 401/403 denies, anything else is an authorizer failure.
#[derive(Debug, Clone)]
pub struct RemoteAuthorizer {
    http: reqwest::Client,
    url: String,
}

impl RemoteAuthorizer {
    pub fn new(url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ServerError::InvalidConfig(
                "auth_url".to_string(),
                format!("expected an http(s) URL, got '{url}'"),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServerError::Transport(format!("failed to build auth client: {e}")))?;
        Ok(Self { http, url })
    }
}

#[async_trait]
impl Authorizer for RemoteAuthorizer {
    async fn authorize(&self, authorization: &str) -> Result<bool, AuthorizerError> {
        let response = self
            .http
            .get(&self.url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| AuthorizerError::Unreachable(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        match status.as_u16() {
            401 | 403 => Ok(false),
            other => Err(AuthorizerError::UnexpectedStatus(other)),
        }
    }
}

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// axum middleware enforcing the authorization order described above.
pub async fn require_authorization(
    State(authorizer): State<Arc<dyn Authorizer>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned);

    let Some(authorization) = authorization else {
        return json_error(StatusCode::UNAUTHORIZED, "Authorization header required");
    };

    match authorizer.authorize(&authorization).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!("Request denied by authorizer");
            return json_error(StatusCode::UNAUTHORIZED, "Unauthorized");
        }
        Err(e) => {
            tracing::error!(error = %e, "Authorizer failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Authorization failed");
        }
    }

    let credential = request
        .headers()
        .get(CREDENTIAL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| CredentialOverride(v.to_owned()));
    if let Some(credential) = credential {
        request.extensions_mut().insert(credential);
    }

    next.run(request).await
}
