//! HTTP binding: `GET /health` and a stateless JSON-RPC endpoint at `POST /`.
//!
//! Every POST is a self-contained exchange. There is no session: `initialize`
//! simply returns the server info, and `tools/call` does not require a prior
//! handshake. Notifications are acknowledged with `202 Accepted`.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::context::{CallContext, CredentialOverride};
use crate::dispatch::Dispatcher;
use crate::error::ServerError;
use crate::server::auth::{require_authorization, Authorizer};
use crate::server::rpc;

#[derive(Clone)]
struct AppState {
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

/// Build the HTTP front door. Only the JSON-RPC endpoint is behind `authorizer`.
pub fn router(
    dispatcher: Dispatcher,
    authorizer: Arc<dyn Authorizer>,
    cancel: CancellationToken,
) -> Router {
    let rpc = post(handle_rpc)
        .fallback(method_not_allowed)
        .layer(axum::middleware::from_fn_with_state(
            authorizer,
            require_authorization,
        ));

    Router::new()
        .route("/health", get(health).fallback(method_not_allowed))
        .route("/", rpc)
        .with_state(AppState { dispatcher, cancel })
}

/// Bind `addr` and serve `app` until `cancel` fires.
pub async fn serve_http(addr: &str, app: Router, cancel: CancellationToken) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| ServerError::Transport(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn health() -> Response {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")})).into_response()
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({"error": "Method not allowed"})),
    )
        .into_response()
}

async fn handle_rpc(
    State(state): State<AppState>,
    credential: Option<Extension<CredentialOverride>>,
    body: Bytes,
) -> Response {
    let request = match rpc::parse(&body) {
        Ok(request) => request,
        Err(reply) => return Json(reply).into_response(),
    };
    let Some(id) = request.id else {
        tracing::debug!(method = %request.method, "Notification acknowledged");
        return StatusCode::ACCEPTED.into_response();
    };

    let ctx = CallContext::new(state.cancel.child_token())
        .with_credential(credential.map(|Extension(c)| c));

    let outcome = rpc::respond(&state.dispatcher, &request.method, request.params, ctx).await;
    let reply = match outcome {
        Ok(result) => rpc::result_envelope(id, result),
        Err(error) => rpc::error_envelope(id, error),
    };
    Json(reply).into_response()
}
