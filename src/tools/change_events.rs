//! Change event tools, for correlating incidents with deploys and config changes.

use futures::FutureExt;
use serde_json::Value;

use super::{list_envelope, unwrap_field};
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolSpec};
use crate::context::CallContext;
use crate::gateway::{PagerDutyClient, Query};

const SINCE: ParamSpec =
    ParamSpec::string("since", "Range start, ISO 8601 (e.g. '2024-01-15T00:00:00Z')");
const UNTIL: ParamSpec =
    ParamSpec::string("until", "Range end, ISO 8601 (e.g. '2024-01-16T00:00:00Z')");

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "list_change_events",
            "List Change Events",
            "List change events (deploys, releases, config changes) across the \
             account. Use them to check whether a recent change caused an incident.",
        )
        .param(SINCE)
        .param(UNTIL)
        .param(ParamSpec::string("team_ids", "Only these teams, comma-separated"))
        .param(ParamSpec::string("service_ids", "Only these services, comma-separated"))
        .param(ParamSpec::limit())
        .handler(list_change_events),
        ToolSpec::read(
            "get_change_event",
            "Get Change Event",
            "Fetch one change event with its summary, source and links.",
        )
        .param(ParamSpec::string("change_event_id", "The change event ID").required())
        .handler(get_change_event),
        ToolSpec::read(
            "list_service_change_events",
            "List Service Change Events",
            "List the change events of one service. Useful when an incident on that \
             service may have been caused by a recent deploy.",
        )
        .param(ParamSpec::string("service_id", "The service ID (e.g. 'PSVC123')").required())
        .param(SINCE)
        .param(UNTIL)
        .param(ParamSpec::limit())
        .handler(list_service_change_events),
        ToolSpec::read(
            "list_incident_change_events",
            "List Related Change Events",
            "List the change events PagerDuty correlated with an incident: changes \
             made around the time it started that may have caused it.",
        )
        .param(ParamSpec::string("incident_id", "The incident ID (e.g. 'PABC123')").required())
        .param(ParamSpec::limit())
        .handler(list_incident_change_events),
    ]
}

fn list_change_events(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let query = Query::new()
            .scalar_opt("since", args.optional_str("since")?)
            .scalar_opt("until", args.optional_str("until")?)
            .array_joined("team_ids", args.optional_str("team_ids")?)
            .array_joined("service_ids", args.optional_str("service_ids")?)
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/change_events", &query).await?;
        Ok(list_envelope(body, "change_events"))
    }
    .boxed()
}

fn get_change_event(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("change_event_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/change_events/{id}"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "change_event"))
    }
    .boxed()
}

fn list_service_change_events(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("service_id")?;
        let query = Query::new()
            .scalar_opt("since", args.optional_str("since")?)
            .scalar_opt("until", args.optional_str("until")?)
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client
            .get_json(&ctx, &format!("/services/{id}/change_events"), &query)
            .await?;
        Ok(list_envelope(body, "change_events"))
    }
    .boxed()
}

fn list_incident_change_events(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("incident_id")?;
        let query = Query::new().scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client
            .get_json(&ctx, &format!("/incidents/{id}/related_change_events"), &query)
            .await?;
        Ok(list_envelope(body, "change_events"))
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use crate::tools::test_support::{call, json};
    use serde_json::json;

    #[tokio::test]
    async fn test_list_change_events_filters() {
        let backend = FakeBackend::builder()
            .on("GET", "/change_events", json!({"change_events": [{"id": "C1", "summary": "deploy v2"}]}))
            .start()
            .await;
        let result = call(
            read_tools(),
            &backend.client(),
            "list_change_events",
            json!({"service_ids": "S1,S2", "since": "2024-01-15T00:00:00Z"}),
        )
        .await;
        assert_eq!(json(&result)["response"][0]["summary"], "deploy v2");
        let req = backend.single_request();
        assert_eq!(req.query_values("service_ids[]"), vec!["S1,S2"]);
        assert_eq!(req.query_values("since"), vec!["2024-01-15T00:00:00Z"]);
    }

    #[tokio::test]
    async fn test_incident_change_events_path() {
        let backend = FakeBackend::builder()
            .on("GET", "/incidents/P1/related_change_events", json!({"change_events": [{"id": "C9"}]}))
            .start()
            .await;
        let result = call(
            read_tools(),
            &backend.client(),
            "list_incident_change_events",
            json!({"incident_id": "P1", "limit": 3}),
        )
        .await;
        assert_eq!(json(&result), json!({"response": [{"id": "C9"}]}));
    }

    #[tokio::test]
    async fn test_get_change_event_missing_field_is_null() {
        let backend = FakeBackend::builder()
            .on("GET", "/change_events/C1", json!({}))
            .start()
            .await;
        let result = call(read_tools(), &backend.client(), "get_change_event", json!({"change_event_id": "C1"})).await;
        assert_eq!(json(&result), Value::Null);
    }
}
