//! In-process fake PagerDuty backend for tests.
//!
//! Binds an axum router to `127.0.0.1:0`, records every request and answers
//! from a table of canned replies. Unmatched requests get `200 {}`.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query as QueryExtract, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::gateway::PagerDutyClient;

/// One request as seen by the fake backend.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query_values(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

#[derive(Clone)]
struct Reply {
    method: String,
    path: String,
    query: Option<(String, String)>,
    status: u16,
    body: String,
    delay: Duration,
}

#[derive(Default)]
struct FakeState {
    replies: Vec<Reply>,
    recorded: Mutex<Vec<RecordedRequest>>,
}

#[derive(Default)]
pub(crate) struct FakeBackendBuilder {
    replies: Vec<Reply>,
}

impl FakeBackendBuilder {
    /// Answer `method path` with `200` and `body`.
    pub fn on(self, method: &str, path: &str, body: Value) -> Self {
        self.on_status(method, path, 200, &body.to_string())
    }

    /// Answer `method path` with an arbitrary status and raw body.
    pub fn on_status(mut self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.replies.push(Reply {
            method: method.to_string(),
            path: path.to_string(),
            query: None,
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        });
        self
    }

    /// Answer `method path` with `200` and `body` after `delay`.
    pub fn on_delayed(
        mut self,
        method: &str,
        path: &str,
        delay: Duration,
        body: Value,
    ) -> Self {
        self.replies.push(Reply {
            method: method.to_string(),
            path: path.to_string(),
            query: None,
            status: 200,
            body: body.to_string(),
            delay,
        });
        self
    }

    /// Answer only when the query string carries `key=value`.
    pub fn on_query(
        mut self,
        method: &str,
        path: &str,
        key: &str,
        value: &str,
        body: Value,
    ) -> Self {
        self.replies.push(Reply {
            method: method.to_string(),
            path: path.to_string(),
            query: Some((key.to_string(), value.to_string())),
            status: 200,
            body: body.to_string(),
            delay: Duration::ZERO,
        });
        self
    }

    pub async fn start(self) -> FakeBackend {
        let state = Arc::new(FakeState {
            replies: self.replies,
            recorded: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        FakeBackend { addr, state }
    }
}

pub(crate) struct FakeBackend {
    addr: SocketAddr,
    state: Arc<FakeState>,
}

impl FakeBackend {
    pub fn builder() -> FakeBackendBuilder {
        FakeBackendBuilder::default()
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client pointed at this backend with default credential `default-key`.
    pub fn client(&self) -> PagerDutyClient {
        PagerDutyClient::new(ClientConfig::new("default-key").with_api_host(self.url()))
            .expect("client")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.recorded.lock().expect("lock").clone()
    }

    /// The only recorded request; panics when there is not exactly one.
    pub fn single_request(&self) -> RecordedRequest {
        let mut requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one backend request");
        requests.remove(0)
    }
}

async fn handle(
    State(state): State<Arc<FakeState>>,
    method: Method,
    uri: Uri,
    QueryExtract(query): QueryExtract<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let recorded = RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        query: query.clone(),
        headers,
        body: serde_json::from_slice(&body).ok(),
    };
    state.recorded.lock().expect("lock").push(recorded);

    let reply = state.replies.iter().find(|r| {
        r.method == method.as_str()
            && r.path == path
            && r.query
                .as_ref()
                .is_none_or(|(k, v)| query.iter().any(|(qk, qv)| qk == k && qv == v))
    });

    match reply {
        Some(reply) => {
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::OK);
            (
                status,
                [("content-type", "application/json")],
                reply.body.clone(),
            )
                .into_response()
        }
        None => (StatusCode::OK, [("content-type", "application/json")], "{}").into_response(),
    }
}
