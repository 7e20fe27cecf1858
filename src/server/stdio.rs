//! Stdio binding: one session per process, newline-delimited JSON-RPC.
//!
//! Messages are handled strictly one at a time: a line is read, answered and
//! flushed before the next line is read, so responses leave in request order.
//! Until `initialize` has been answered only `ping` is accepted. The session
//! ends on EOF or when `cancel` fires.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::context::CallContext;
use crate::dispatch::Dispatcher;
use crate::error::ServerError;
use crate::server::rpc;

/// Serve over the process's stdin and stdout.
pub async fn serve_stdio(dispatcher: Dispatcher, cancel: CancellationToken) -> crate::Result<()> {
    serve_stream(dispatcher, tokio::io::stdin(), tokio::io::stdout(), cancel).await
}

/// Serve one session over an arbitrary byte stream pair.
pub async fn serve_stream<R, W>(
    dispatcher: Dispatcher,
    reader: R,
    mut writer: W,
    cancel: CancellationToken,
) -> crate::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut session = Session::default();

    tracing::info!("Stdio session started, waiting for messages");

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Stdio session cancelled");
                break;
            }
            line = lines.next_line() => line
                .map_err(|e| ServerError::Transport(format!("failed to read stdin: {e}")))?,
        };
        let Some(line) = line else {
            tracing::info!("Stdio session completed: input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let Some(reply) = session.handle(&dispatcher, &line, &cancel).await else {
            continue;
        };
        let mut out = serde_json::to_vec(&reply)
            .map_err(|e| ServerError::Transport(format!("failed to encode response: {e}")))?;
        out.push(b'\n');
        writer
            .write_all(&out)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to write stdout: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| ServerError::Transport(format!("failed to flush stdout: {e}")))?;
    }

    Ok(())
}

/// Handshake state of the single stdio session.
#[derive(Debug, Default)]
struct Session {
    initialized: bool,
}

impl Session {
    /// Answer one line. `None` for notifications.
    async fn handle(
        &mut self,
        dispatcher: &Dispatcher,
        line: &str,
        cancel: &CancellationToken,
    ) -> Option<Value> {
        let request = match rpc::parse(line.as_bytes()) {
            Ok(request) => request,
            Err(reply) => return Some(reply),
        };
        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "Notification received");
            return None;
        };

        if !self.initialized && !matches!(request.method.as_str(), "initialize" | "ping") {
            tracing::warn!(method = %request.method, "Request before initialize");
            return Some(rpc::error_envelope(
                id,
                rmcp::ErrorData::invalid_request("server not initialized", None),
            ));
        }

        let ctx = CallContext::new(cancel.child_token());
        let outcome = rpc::respond(dispatcher, &request.method, request.params, ctx).await;
        if request.method == "initialize" && outcome.is_ok() {
            self.initialized = true;
        }
        Some(match outcome {
            Ok(result) => rpc::result_envelope(id, result),
            Err(error) => rpc::error_envelope(id, error),
        })
    }
}
