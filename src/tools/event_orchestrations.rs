//! Event orchestration tools: lookup of the router, global and service paths,
//! plus router replacement and single-rule append.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{list_envelope, unwrap_field};
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolSpec};
use crate::context::CallContext;
use crate::error::ToolError;
use crate::gateway::{PagerDutyClient, Query};

const ORCHESTRATION_ID: ParamSpec =
    ParamSpec::string("orchestration_id", "The orchestration ID (e.g. 'E1A2B3C')").required();

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "list_event_orchestrations",
            "List Event Orchestrations",
            "List event orchestrations. Orchestrations process incoming events and \
             route them to services by rule, and can transform, enrich, suppress or \
             deduplicate events before an incident is opened.",
        )
        .param(ParamSpec::limit())
        .handler(list_event_orchestrations),
        ToolSpec::read(
            "get_event_orchestration",
            "Get Event Orchestration",
            "Fetch one event orchestration, including the integration that receives \
             its events.",
        )
        .param(ORCHESTRATION_ID)
        .handler(get_event_orchestration),
        ToolSpec::read(
            "get_event_orchestration_router",
            "Get Orchestration Router Rules",
            "Fetch the router of an orchestration: the rule sets that pick the \
             service an event is sent to, and the catch-all.",
        )
        .param(ORCHESTRATION_ID)
        .handler(get_event_orchestration_router),
        ToolSpec::read(
            "get_event_orchestration_global",
            "Get Global Orchestration Rules",
            "Fetch the global rules of an orchestration, which run before routing \
             and can suppress, deduplicate or transform events.",
        )
        .param(ORCHESTRATION_ID)
        .handler(get_event_orchestration_global),
        ToolSpec::read(
            "get_event_orchestration_service",
            "Get Service Orchestration Rules",
            "Fetch the service-level orchestration rules of a service. They run after \
             routing and can set severity, add notes or trigger automation.",
        )
        .param(ParamSpec::string("service_id", "The service ID (e.g. 'PSVC123')").required())
        .handler(get_event_orchestration_service),
    ]
}

pub fn write_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::write(
            "update_event_orchestration_router",
            "Update Orchestration Router",
            "Replace the whole router configuration of an orchestration. Every \
             existing rule is overwritten. To add one rule use \
             append_event_orchestration_router_rule instead.",
        )
        .param(ORCHESTRATION_ID)
        .param(
            ParamSpec::string(
                "config",
                "Full router configuration as JSON, with 'orchestration_path' holding \
                 'sets' and 'catch_all'",
            )
            .required(),
        )
        .idempotent()
        .handler(update_event_orchestration_router),
        ToolSpec::write(
            "append_event_orchestration_router_rule",
            "Add Router Rule",
            "Append one routing rule to the first rule set of an orchestration's \
             router. Existing rules and the catch-all are kept as they are.",
        )
        .param(ORCHESTRATION_ID)
        .param(ParamSpec::string(
            "label",
            "Readable label for the rule (e.g. 'Route database alerts')",
        ))
        .param(ParamSpec::string(
            "conditions",
            "JSON array of conditions, each with a PCL 'expression' \
             (e.g. [{\"expression\": \"event.source matches 'db'\"}])",
        ))
        .param(
            ParamSpec::string("route_to", "Service ID that matching events go to").required(),
        )
        .handler(append_event_orchestration_router_rule),
    ]
}

fn router_path(id: &str) -> String {
    format!("/event_orchestrations/{id}/router")
}

fn list_event_orchestrations(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let query = Query::new().scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/event_orchestrations", &query).await?;
        Ok(list_envelope(body, "orchestrations"))
    }
    .boxed()
}

fn get_event_orchestration(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("orchestration_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/event_orchestrations/{id}"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "orchestration"))
    }
    .boxed()
}

fn get_event_orchestration_router(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("orchestration_id")?;
        let body: Value = client.get_json(&ctx, &router_path(id), &Query::new()).await?;
        Ok(unwrap_field(body, "orchestration_path"))
    }
    .boxed()
}

fn get_event_orchestration_global(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("orchestration_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/event_orchestrations/{id}/global"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "orchestration_path"))
    }
    .boxed()
}

fn get_event_orchestration_service(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("service_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/event_orchestrations/services/{id}"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "orchestration_path"))
    }
    .boxed()
}

fn update_event_orchestration_router(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("orchestration_id")?;
        let raw = args.require_str("config")?;
        let config = parse_router_config(raw)?;
        let body: Value = client.put_json(&ctx, &router_path(id), &config).await?;
        Ok(unwrap_field(body, "orchestration_path"))
    }
    .boxed()
}

fn parse_router_config(raw: &str) -> Result<Value, ToolError> {
    let config: Value = serde_json::from_str(raw)
        .map_err(|e| ToolError::InvalidArgument("config JSON".into(), e.to_string()))?;
    match config.get("orchestration_path") {
        Some(Value::Object(_)) => Ok(config),
        _ => Err(ToolError::InvalidArgument(
            "config".into(),
            "expected an object with an 'orchestration_path' object".into(),
        )),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleCondition {
    expression: String,
}

#[derive(Serialize)]
struct RouteAction<'a> {
    route_to: &'a str,
}

#[derive(Serialize)]
struct NewRule<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conditions: Option<Vec<RuleCondition>>,
    actions: RouteAction<'a>,
}

/// Read-modify-write of the router. A concurrent edit between the GET and the
/// PUT is silently overwritten; the backend offers no version check here.
fn append_event_orchestration_router_rule(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("orchestration_id")?;
        let route_to = args.require_str("route_to")?;
        let conditions = args
            .optional_str("conditions")?
            .map(|raw| {
                serde_json::from_str::<Vec<RuleCondition>>(raw).map_err(|e| {
                    ToolError::InvalidArgument("conditions JSON".into(), e.to_string())
                })
            })
            .transpose()?;
        let rule = NewRule {
            label: args.optional_str("label")?,
            conditions,
            actions: RouteAction { route_to },
        };

        let current: Value = client
            .get_json(&ctx, &router_path(id), &Query::new())
            .await
            .map_err(|e| ToolError::Precondition(format!("failed to get current router: {e}")))?;
        let update = append_rule(id, current, &rule)?;

        let body: Value = client.put_json(&ctx, &router_path(id), &update).await?;
        Ok(unwrap_field(body, "orchestration_path"))
    }
    .boxed()
}

/// Build the PUT body: `sets` with `rule` appended to the first set, and
/// `catch_all` carried over untouched.
fn append_rule(id: &str, mut current: Value, rule: &NewRule<'_>) -> Result<Value, ToolError> {
    let mut path = match current.get_mut("orchestration_path").map(Value::take) {
        Some(Value::Object(path)) => path,
        _ => Map::new(),
    };
    let mut sets = match path.remove("sets") {
        Some(Value::Array(sets)) if !sets.is_empty() => sets,
        _ => {
            return Err(ToolError::Precondition(format!(
                "orchestration {id} router has no rule sets to append to"
            )));
        }
    };

    let rule = serde_json::to_value(rule)
        .map_err(|e| ToolError::InvalidArgument("rule".into(), e.to_string()))?;
    let Some(first) = sets[0].as_object_mut() else {
        return Err(ToolError::Precondition(format!(
            "orchestration {id} router has a malformed first rule set"
        )));
    };
    match first.get_mut("rules") {
        Some(Value::Array(rules)) => rules.push(rule),
        _ => {
            first.insert("rules".into(), Value::Array(vec![rule]));
        }
    }

    let mut update = Map::new();
    update.insert("sets".into(), Value::Array(sets));
    if let Some(catch_all) = path.remove("catch_all") {
        update.insert("catch_all".into(), catch_all);
    }
    Ok(serde_json::json!({ "orchestration_path": update }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use crate::tools::test_support::{call, is_error, json, text};
    use serde_json::json;

    fn all() -> Vec<ToolDef> {
        read_tools().into_iter().chain(write_tools()).collect()
    }

    fn existing_router() -> Value {
        json!({
            "orchestration_path": {
                "type": "router",
                "parent": {"id": "E1"},
                "sets": [
                    {"id": "start", "rules": [
                        {
                            "id": "r1",
                            "label": "db",
                            "conditions": [{"expression": "event.source matches 'db'"}],
                            "actions": {"route_to": "PSVC1"}
                        }
                    ]},
                    {"id": "second", "rules": []}
                ],
                "catch_all": {"actions": {"route_to": "unrouted"}}
            }
        })
    }

    /// Router whose single rule set is `first_set`.
    fn single_set_router(first_set: Value) -> Value {
        json!({
            "orchestration_path": {
                "type": "router",
                "sets": [first_set],
                "catch_all": {"actions": {"route_to": "unrouted"}}
            }
        })
    }

    async fn append_to(router: Value, route_to: &str) -> Value {
        let backend = FakeBackend::builder()
            .on("GET", "/event_orchestrations/E1/router", router)
            .on(
                "PUT",
                "/event_orchestrations/E1/router",
                json!({"orchestration_path": {"type": "router"}}),
            )
            .start()
            .await;
        let result = call(
            all(),
            &backend.client(),
            "append_event_orchestration_router_rule",
            json!({"orchestration_id": "E1", "route_to": route_to}),
        )
        .await;
        assert!(!is_error(&result), "{}", text(&result));

        let requests = backend.requests();
        let puts: Vec<_> = requests.iter().filter(|r| r.method == "PUT").collect();
        assert_eq!(puts.len(), 1);
        puts[0].body.clone().expect("put body")
    }

    #[tokio::test]
    async fn test_router_getters_unwrap_path() {
        let backend = FakeBackend::builder()
            .on("GET", "/event_orchestrations/E1/router", existing_router())
            .on(
                "GET",
                "/event_orchestrations/E1/global",
                json!({"orchestration_path": {"type": "global"}}),
            )
            .on(
                "GET",
                "/event_orchestrations/services/S1",
                json!({"orchestration_path": {"type": "service"}}),
            )
            .start()
            .await;
        let client = backend.client();
        let orchestration = json!({"orchestration_id": "E1"});

        let router = call(
            all(),
            &client,
            "get_event_orchestration_router",
            orchestration.clone(),
        )
        .await;
        assert_eq!(json(&router)["type"], "router");
        let global = call(all(), &client, "get_event_orchestration_global", orchestration).await;
        assert_eq!(json(&global)["type"], "global");
        let service = call(
            all(),
            &client,
            "get_event_orchestration_service",
            json!({"service_id": "S1"}),
        )
        .await;
        assert_eq!(json(&service)["type"], "service");
    }

    #[tokio::test]
    async fn test_append_to_empty_rule_set() {
        let put = append_to(single_set_router(json!({"id": "start", "rules": []})), "SVC1").await;
        let path = &put["orchestration_path"];
        assert_eq!(
            path["sets"],
            json!([{"id": "start", "rules": [{"actions": {"route_to": "SVC1"}}]}])
        );
        assert_eq!(path["catch_all"], json!({"actions": {"route_to": "unrouted"}}));
    }

    #[tokio::test]
    async fn test_append_to_rule_set_without_rules_key() {
        let put = append_to(single_set_router(json!({"id": "start"})), "SVC1").await;
        let path = &put["orchestration_path"];
        let rules = path["sets"][0]["rules"].as_array().expect("rules created");
        assert_eq!(rules, &vec![json!({"actions": {"route_to": "SVC1"}})]);
        assert_eq!(path["sets"][0]["id"], "start");
        assert_eq!(path["catch_all"], json!({"actions": {"route_to": "unrouted"}}));
    }

    #[tokio::test]
    async fn test_append_preserves_existing_rules_and_catch_all() {
        let backend = FakeBackend::builder()
            .on("GET", "/event_orchestrations/E1/router", existing_router())
            .on(
                "PUT",
                "/event_orchestrations/E1/router",
                json!({"orchestration_path": {"type": "router"}}),
            )
            .start()
            .await;
        let result = call(
            all(),
            &backend.client(),
            "append_event_orchestration_router_rule",
            json!({
                "orchestration_id": "E1",
                "route_to": "PSVC2",
                "label": "web",
                "conditions": r#"[{"expression": "event.source matches 'web'"}]"#
            }),
        )
        .await;
        assert!(!is_error(&result), "{}", text(&result));

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "GET");
        let put = requests[1].body.clone().expect("put body");
        let path = &put["orchestration_path"];
        assert_eq!(path["catch_all"], json!({"actions": {"route_to": "unrouted"}}));
        assert_eq!(path["sets"][1], json!({"id": "second", "rules": []}));
        let rules = path["sets"][0]["rules"].as_array().expect("rules");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0]["id"], "r1");
        assert_eq!(
            rules[1],
            json!({
                "label": "web",
                "conditions": [{"expression": "event.source matches 'web'"}],
                "actions": {"route_to": "PSVC2"}
            })
        );
        assert!(path.get("parent").is_none());
    }

    #[tokio::test]
    async fn test_append_without_rule_sets_writes_nothing() {
        let backend = FakeBackend::builder()
            .on(
                "GET",
                "/event_orchestrations/E1/router",
                json!({"orchestration_path": {"sets": [], "catch_all": {"actions": {}}}}),
            )
            .start()
            .await;
        let result = call(
            all(),
            &backend.client(),
            "append_event_orchestration_router_rule",
            json!({"orchestration_id": "E1", "route_to": "PSVC2"}),
        )
        .await;
        assert!(is_error(&result));
        assert!(text(&result).contains("no rule sets"));
        assert!(backend.requests().iter().all(|r| r.method == "GET"));
    }

    #[tokio::test]
    async fn test_append_bad_conditions_json() {
        let backend = FakeBackend::builder().start().await;
        let result = call(
            all(),
            &backend.client(),
            "append_event_orchestration_router_rule",
            json!({"orchestration_id": "E1", "route_to": "PSVC2", "conditions": "[{"}),
        )
        .await;
        assert!(is_error(&result));
        assert!(text(&result).starts_with("invalid conditions JSON: "));
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_append_router_fetch_failure_is_prefixed() {
        let backend = FakeBackend::builder()
            .on_status("GET", "/event_orchestrations/E1/router", 404, "missing")
            .start()
            .await;
        let result = call(
            all(),
            &backend.client(),
            "append_event_orchestration_router_rule",
            json!({"orchestration_id": "E1", "route_to": "PSVC2"}),
        )
        .await;
        assert_eq!(
            text(&result),
            "failed to get current router: API error (status 404): missing"
        );
    }

    #[tokio::test]
    async fn test_update_router_forwards_config() {
        let backend = FakeBackend::builder()
            .on(
                "PUT",
                "/event_orchestrations/E1/router",
                json!({"orchestration_path": {"sets": []}}),
            )
            .start()
            .await;
        let config = json!({
            "orchestration_path": {
                "sets": [{"id": "start", "rules": []}],
                "catch_all": {"actions": {}}
            }
        });
        let result = call(
            all(),
            &backend.client(),
            "update_event_orchestration_router",
            json!({"orchestration_id": "E1", "config": config.to_string()}),
        )
        .await;
        assert_eq!(json(&result), json!({"sets": []}));
        assert_eq!(backend.single_request().body, Some(config));
    }

    #[tokio::test]
    async fn test_update_router_rejects_bad_config() {
        let backend = FakeBackend::builder().start().await;
        let client = backend.client();
        let malformed = call(
            all(),
            &client,
            "update_event_orchestration_router",
            json!({"orchestration_id": "E1", "config": "{not json"}),
        )
        .await;
        assert!(text(&malformed).starts_with("invalid config JSON: "));

        let wrong_shape = call(
            all(),
            &client,
            "update_event_orchestration_router",
            json!({"orchestration_id": "E1", "config": "[1, 2]"}),
        )
        .await;
        assert!(is_error(&wrong_shape));
        assert!(backend.requests().is_empty());
    }
}
