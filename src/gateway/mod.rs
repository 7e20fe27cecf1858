//! Backend gateway: authenticated HTTP access to the PagerDuty REST API.
//!
//! Every call takes a [`CallContext`]. The context decides which credential
//! is sent and carries the cancellation token that aborts the in-flight
//! request when the inbound request goes away.

pub mod query;

use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, FROM, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::error::GatewayError;

pub use query::{split_ids, Query};

/// Versioned media type required by the REST API.
const ACCEPT_V2: &str = "application/vnd.pagerduty+json;version=2";

/// Fixed page size used by [`PagerDutyClient::paginate`].
pub const PAGE_SIZE: usize = 100;

/// Cheap-to-clone handle over a shared `reqwest::Client` and immutable config.
#[derive(Clone)]
pub struct PagerDutyClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    user_agent: String,
}

impl PagerDutyClient {
    pub fn new(config: ClientConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            config: Arc::new(config),
            user_agent: format!("pagerduty-mcp/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET `path` with `query`, returning the raw body.
    pub async fn get(
        &self,
        ctx: &CallContext,
        path: &str,
        query: &Query,
    ) -> Result<Vec<u8>, GatewayError> {
        self.send(ctx, Method::GET, path, query, None).await
    }

    /// POST a JSON body, returning the raw response body.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &B,
    ) -> Result<Vec<u8>, GatewayError> {
        let body = encode(body)?;
        self.send(ctx, Method::POST, path, &Query::new(), Some(body))
            .await
    }

    /// PUT a JSON body, returning the raw response body.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &B,
    ) -> Result<Vec<u8>, GatewayError> {
        let body = encode(body)?;
        self.send(ctx, Method::PUT, path, &Query::new(), Some(body))
            .await
    }

    pub async fn delete(&self, ctx: &CallContext, path: &str) -> Result<Vec<u8>, GatewayError> {
        self.send(ctx, Method::DELETE, path, &Query::new(), None)
            .await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
        query: &Query,
    ) -> Result<T, GatewayError> {
        decode(&self.get(ctx, path, query).await?)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        decode(&self.post(ctx, path, body).await?)
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        path: &str,
        body: &B,
    ) -> Result<T, GatewayError> {
        decode(&self.put(ctx, path, body).await?)
    }

    /// Walk a paginated list endpoint with a fixed page size.
    ///
    /// `on_page` receives each decoded page and returns how many records it
    /// consumed. Stops when the backend reports no `more` pages, when a page
    /// cannot be decoded, when a page is empty, or once `max_results`
    /// records have been consumed (`0` means no budget). Returns the total
    /// consumed.
    pub async fn paginate<F>(
        &self,
        ctx: &CallContext,
        path: &str,
        query: &Query,
        max_results: usize,
        mut on_page: F,
    ) -> Result<usize, GatewayError>
    where
        F: FnMut(&serde_json::Value) -> Result<usize, GatewayError>,
    {
        let mut offset = 0usize;
        let mut fetched = 0usize;

        loop {
            let page_query = query
                .clone()
                .set("offset", offset)
                .set("limit", PAGE_SIZE);
            let body = self.get(ctx, path, &page_query).await?;

            let Ok(page) = serde_json::from_slice::<serde_json::Value>(&body) else {
                tracing::debug!(path, offset, "stopping pagination on undecodable page");
                break;
            };

            let count = on_page(&page)?;
            fetched += count;

            if max_results > 0 && fetched >= max_results {
                break;
            }
            let more = page
                .get("more")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);
            if !more || count == 0 {
                break;
            }
            offset += PAGE_SIZE;
        }

        Ok(fetched)
    }

    async fn send(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, GatewayError> {
        let credential = ctx.resolve_credential(&self.config.api_key);
        if credential.is_empty() {
            return Err(GatewayError::MissingCredential);
        }

        let url = format!("{}{}", self.config.api_host, path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(AUTHORIZATION, format!("Token token={credential}"))
            .header(ACCEPT, ACCEPT_V2)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, &self.user_agent);
        if let Some(email) = &self.config.from_email {
            request = request.header(FROM, email);
        }
        if !query.is_empty() {
            request = request.query(query.pairs());
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let start = Instant::now();
        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            let status = response.status();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| GatewayError::Transport(format!("failed to read response: {e}")))?;
            Ok::<_, GatewayError>((status, bytes))
        };

        let (status, bytes) = tokio::select! {
            biased;
            _ = ctx.cancellation().cancelled() => {
                tracing::debug!(method = %method, path, "backend call cancelled");
                return Err(GatewayError::Cancelled);
            }
            result = exchange => result?,
        };

        tracing::debug!(
            method = %method,
            path,
            status = status.as_u16(),
            override_credential = ctx.has_override(),
            duration_ms = start.elapsed().as_millis() as u64,
            "backend call completed"
        );

        if status.as_u16() >= 400 {
            return Err(GatewayError::Backend {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(bytes.to_vec())
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, GatewayError> {
    serde_json::to_vec(body).map_err(|e| GatewayError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CredentialOverride;
    use crate::testing::FakeBackend;
    use serde_json::{json, Value};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_get_sends_auth_and_version_headers() {
        let backend = FakeBackend::builder()
            .on("GET", "/users/me", json!({"user": {"id": "PU1"}}))
            .start()
            .await;
        let client = backend.client();

        let body: Value = client
            .get_json(&CallContext::default(), "/users/me", &Query::new())
            .await
            .expect("get should succeed");
        assert_eq!(body["user"]["id"], "PU1");

        let req = backend.single_request();
        assert_eq!(req.method, "GET");
        assert_eq!(req.header("authorization"), Some("Token token=default-key"));
        assert_eq!(req.header("accept"), Some(ACCEPT_V2));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req
            .header("user-agent")
            .is_some_and(|ua| ua.starts_with("pagerduty-mcp/")));
        assert_eq!(req.header("from"), None);
    }

    #[tokio::test]
    async fn test_override_credential_replaces_default() {
        let backend = FakeBackend::builder().start().await;
        let ctx = CallContext::default()
            .with_credential(Some(CredentialOverride("tenant-b".to_string())));

        backend
            .client()
            .get(&ctx, "/services", &Query::new())
            .await
            .expect("get should succeed");

        let req = backend.single_request();
        assert_eq!(req.header("authorization"), Some("Token token=tenant-b"));
    }

    #[tokio::test]
    async fn test_from_header_when_configured() {
        let backend = FakeBackend::builder().start().await;
        let client = PagerDutyClient::new(
            ClientConfig::new("k")
                .with_api_host(backend.url())
                .with_from_email("oncall@example.com"),
        )
        .expect("client");

        client
            .get(&CallContext::default(), "/teams", &Query::new())
            .await
            .expect("get should succeed");
        assert_eq!(
            backend.single_request().header("from"),
            Some("oncall@example.com")
        );
    }

    #[tokio::test]
    async fn test_array_query_encodings_reach_backend() {
        let backend = FakeBackend::builder().start().await;
        let query = Query::new()
            .array_joined("team_ids", Some("T1,T2"))
            .array("service_ids", Some("S1,S2"))
            .scalar("limit", 10);

        backend
            .client()
            .get(&CallContext::default(), "/incidents", &query)
            .await
            .expect("get should succeed");

        let req = backend.single_request();
        assert_eq!(req.query_values("team_ids[]"), vec!["T1,T2"]);
        assert_eq!(req.query_values("service_ids[]"), vec!["S1", "S2"]);
        assert_eq!(req.query_values("limit"), vec!["10"]);
    }

    #[tokio::test]
    async fn test_status_error_carries_status_and_raw_body() {
        let backend = FakeBackend::builder()
            .on_status("GET", "/incidents/NOPE", 404, r#"{"error":{"code":2100}}"#)
            .start()
            .await;

        let err = backend
            .client()
            .get(&CallContext::default(), "/incidents/NOPE", &Query::new())
            .await
            .unwrap_err();
        match err {
            GatewayError::Backend { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, r#"{"error":{"code":2100}}"#);
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_post_and_put_send_json_body() {
        let backend = FakeBackend::builder().start().await;
        let client = backend.client();
        let ctx = CallContext::default();

        client
            .post(&ctx, "/teams", &json!({"team": {"name": "SRE"}}))
            .await
            .expect("post");
        client
            .put(&ctx, "/teams/T1", &json!({"team": {"name": "Ops"}}))
            .await
            .expect("put");
        client.delete(&ctx, "/teams/T1").await.expect("delete");

        let reqs = backend.requests();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].method, "POST");
        assert_eq!(reqs[0].body, Some(json!({"team": {"name": "SRE"}})));
        assert_eq!(reqs[1].method, "PUT");
        assert_eq!(reqs[1].path, "/teams/T1");
        assert_eq!(reqs[2].method, "DELETE");
        assert_eq!(reqs[2].body, None);
    }

    #[tokio::test]
    async fn test_transport_error_is_distinct() {
        let client =
            PagerDutyClient::new(ClientConfig::new("k").with_api_host("http://127.0.0.1:1"))
                .expect("client");
        let err = client
            .get(&CallContext::default(), "/users/me", &Query::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));
        assert!(err.to_string().starts_with("request failed: "));
    }

    #[tokio::test]
    async fn test_cancelled_context_aborts_call() {
        let backend = FakeBackend::builder().start().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = backend
            .client()
            .get(&CallContext::new(cancel), "/users/me", &Query::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
    }

    #[tokio::test]
    async fn test_decode_error_on_non_json_body() {
        let backend = FakeBackend::builder()
            .on_status("GET", "/users/me", 200, "not json")
            .start()
            .await;
        let err = backend
            .client()
            .get_json::<Value>(&CallContext::default(), "/users/me", &Query::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }

    #[tokio::test]
    async fn test_paginate_walks_until_no_more() {
        let backend = FakeBackend::builder()
            .on_query(
                "GET",
                "/users",
                "offset",
                "0",
                json!({"users": [{"id": "U1"}, {"id": "U2"}], "more": true}),
            )
            .on_query(
                "GET",
                "/users",
                "offset",
                "100",
                json!({"users": [{"id": "U3"}], "more": false}),
            )
            .start()
            .await;

        let mut ids = Vec::new();
        let total = backend
            .client()
            .paginate(
                &CallContext::default(),
                "/users",
                &Query::new().scalar("query", "a"),
                0,
                |page| {
                    let users = page["users"].as_array().cloned().unwrap_or_default();
                    ids.extend(users.iter().filter_map(|u| u["id"].as_str().map(String::from)));
                    Ok(users.len())
                },
            )
            .await
            .expect("paginate");

        assert_eq!(total, 3);
        assert_eq!(ids, vec!["U1", "U2", "U3"]);
        let reqs = backend.requests();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].query_values("limit"), vec!["100"]);
        assert_eq!(reqs[1].query_values("offset"), vec!["100"]);
        assert_eq!(reqs[1].query_values("query"), vec!["a"]);
    }

    #[tokio::test]
    async fn test_paginate_respects_budget() {
        let backend = FakeBackend::builder()
            .on(
                "GET",
                "/users",
                json!({"users": [{"id": "U1"}, {"id": "U2"}], "more": true}),
            )
            .start()
            .await;

        let total = backend
            .client()
            .paginate(&CallContext::default(), "/users", &Query::new(), 2, |page| {
                Ok(page["users"].as_array().map_or(0, Vec::len))
            })
            .await
            .expect("paginate");
        assert_eq!(total, 2);
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_paginate_stops_on_undecodable_page() {
        let backend = FakeBackend::builder()
            .on_status("GET", "/users", 200, "<html>")
            .start()
            .await;
        let total = backend
            .client()
            .paginate(&CallContext::default(), "/users", &Query::new(), 0, |_| Ok(1))
            .await
            .expect("paginate");
        assert_eq!(total, 0);
    }
}
