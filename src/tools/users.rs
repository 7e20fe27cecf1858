//! User tools.

use futures::FutureExt;
use serde_json::Value;

use super::{list_envelope, unwrap_field};
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolSpec};
use crate::context::CallContext;
use crate::gateway::{PagerDutyClient, Query};

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "get_user_data",
            "Get Current User",
            "Return the user that owns the API token in use: ID, name, email and \
             role. Call it first to scope later requests to this user's ID.",
        )
        .handler(get_user_data),
        ToolSpec::read(
            "list_users",
            "List Users",
            "List users in the account. Use it to find user IDs for assignments, \
             team membership or incident filters.",
        )
        .param(ParamSpec::string("query", "Filter by name or email (partial match)"))
        .param(ParamSpec::string(
            "team_ids",
            "Only members of these teams, comma-separated (e.g. 'PTEAM1,PTEAM2')",
        ))
        .param(ParamSpec::limit())
        .handler(list_users),
    ]
}

fn get_user_data(client: PagerDutyClient, ctx: CallContext, _args: Arguments) -> HandlerFuture {
    async move {
        let body: Value = client.get_json(&ctx, "/users/me", &Query::new()).await?;
        Ok(unwrap_field(body, "user"))
    }
    .boxed()
}

fn list_users(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let query = Query::new()
            .scalar_opt("query", args.optional_str("query")?)
            .array_joined("team_ids", args.optional_str("team_ids")?)
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/users", &query).await?;
        Ok(list_envelope(body, "users"))
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CallContext, CredentialOverride};
    use crate::catalog::Arguments;
    use crate::testing::FakeBackend;
    use crate::tools::test_support::{call, json};
    use serde_json::json;

    #[tokio::test]
    async fn test_get_user_data_unwraps_user() {
        let backend = FakeBackend::builder()
            .on("GET", "/users/me", json!({"user": {"id": "PME", "email": "me@example.com"}}))
            .start()
            .await;
        let result = call(read_tools(), &backend.client(), "get_user_data", json!({})).await;
        assert_eq!(json(&result), json!({"id": "PME", "email": "me@example.com"}));
        assert_eq!(
            backend.single_request().header("authorization"),
            Some("Token token=default-key")
        );
    }

    #[tokio::test]
    async fn test_get_user_data_uses_caller_credential() {
        let backend = FakeBackend::builder()
            .on("GET", "/users/me", json!({"user": {"id": "PCALLER"}}))
            .start()
            .await;
        let ctx = CallContext::default()
            .with_credential(Some(CredentialOverride("caller-key".into())));
        let output = get_user_data(backend.client(), ctx, Arguments::default())
            .await
            .expect("call succeeds");
        assert_eq!(output.into_result().is_error, Some(false));
        assert_eq!(
            backend.single_request().header("authorization"),
            Some("Token token=caller-key")
        );
    }

    #[tokio::test]
    async fn test_list_users_envelope_and_filters() {
        let backend = FakeBackend::builder()
            .on("GET", "/users", json!({"users": [{"id": "U1"}, {"id": "U2"}]}))
            .start()
            .await;
        let result = call(
            read_tools(),
            &backend.client(),
            "list_users",
            json!({"query": "ann", "team_ids": "T1", "limit": 2}),
        )
        .await;
        assert_eq!(json(&result)["response"].as_array().map(Vec::len), Some(2));
        let req = backend.single_request();
        assert_eq!(req.query_values("team_ids[]"), vec!["T1"]);
        assert_eq!(req.query_values("limit"), vec!["2"]);
    }
}
