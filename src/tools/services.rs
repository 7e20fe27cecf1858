//! Service tools.

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use super::{list_envelope, unwrap_field, Reference};
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolSpec};
use crate::context::CallContext;
use crate::gateway::{PagerDutyClient, Query};

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "list_services",
            "List Services",
            "List services, the monitored applications and components that receive \
             alerts and open incidents. Use it to find service IDs for incident \
             filters or to see what is being monitored.",
        )
        .param(ParamSpec::string("query", "Filter by name (partial match)"))
        .param(ParamSpec::string(
            "team_ids",
            "Only services owned by these teams, comma-separated (e.g. 'PTEAM1,PTEAM2')",
        ))
        .param(ParamSpec::limit())
        .handler(list_services),
        ToolSpec::read(
            "get_service",
            "Get Service Details",
            "Fetch one service with its escalation policy, integrations and settings.",
        )
        .param(ParamSpec::string("service_id", "The service ID (e.g. 'PSVC123')").required())
        .handler(get_service),
    ]
}

pub fn write_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::write(
            "create_service",
            "Create Service",
            "Create a service for a monitored application or component. The \
             escalation policy decides who is notified when it opens incidents.",
        )
        .param(ParamSpec::string("name", "Service name (e.g. 'Payment Gateway')").required())
        .param(
            ParamSpec::string(
                "escalation_policy_id",
                "Escalation policy that defines notification rules (e.g. 'PESC123')",
            )
            .required(),
        )
        .param(ParamSpec::string(
            "description",
            "What the service monitors and its business impact",
        ))
        .handler(create_service),
        ToolSpec::write(
            "update_service",
            "Update Service",
            "Rename a service, change its description, or move it to another \
             escalation policy. Only the fields given are changed.",
        )
        .param(ParamSpec::string("service_id", "Service to update (e.g. 'PSVC123')").required())
        .param(ParamSpec::string("name", "New name"))
        .param(ParamSpec::string("description", "New description"))
        .param(ParamSpec::string(
            "escalation_policy_id",
            "New escalation policy (e.g. 'PESC123')",
        ))
        .idempotent()
        .handler(update_service),
    ]
}

fn list_services(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let query = Query::new()
            .scalar_opt("query", args.optional_str("query")?)
            .array_joined("team_ids", args.optional_str("team_ids")?)
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/services", &query).await?;
        Ok(list_envelope(body, "services"))
    }
    .boxed()
}

fn get_service(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("service_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/services/{id}"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "service"))
    }
    .boxed()
}

/// Shared by create and update: `name` and the policy are mandatory on create.
#[derive(Serialize)]
struct ServiceFields<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    escalation_policy: Option<Reference>,
}

#[derive(Serialize)]
struct ServiceRequest<'a> {
    service: ServiceFields<'a>,
}

fn policy_reference(id: &str) -> Reference {
    Reference::new(id, "escalation_policy_reference")
}

fn create_service(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let name = args.require_str("name")?;
        let policy = args.require_str("escalation_policy_id")?;
        let request = ServiceRequest {
            service: ServiceFields {
                kind: "service",
                name: Some(name),
                description: args.optional_str("description")?,
                escalation_policy: Some(policy_reference(policy)),
            },
        };
        let body: Value = client.post_json(&ctx, "/services", &request).await?;
        Ok(unwrap_field(body, "service"))
    }
    .boxed()
}

fn update_service(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("service_id")?;
        let request = ServiceRequest {
            service: ServiceFields {
                kind: "service",
                name: args.optional_str("name")?,
                description: args.optional_str("description")?,
                escalation_policy: args.optional_str("escalation_policy_id")?.map(policy_reference),
            },
        };
        let body: Value = client
            .put_json(&ctx, &format!("/services/{id}"), &request)
            .await?;
        Ok(unwrap_field(body, "service"))
    }
    .boxed()
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

    #[tokio::test]
    async fn test_list_services_forwards_team_ids_verbatim() {
        let backend = FakeBackend::builder()
            .on("GET", "/services", json!({"services": [{"id": "S1", "name": "API"}]}))
            .start()
            .await;
        let result = call(
            all(),
            &backend.client(),
            "list_services",
            json!({"query": "api", "team_ids": "T1,T2", "limit": 10}),
        )
        .await;
        assert_eq!(json(&result), json!({"response": [{"id": "S1", "name": "API"}]}));
        let req = backend.single_request();
        assert_eq!(req.query_values("team_ids[]"), vec!["T1,T2"]);
        assert_eq!(req.query_values("query"), vec!["api"]);
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let created = json!({"id": "SNEW", "name": "Payments", "description": "card flow"});
        let backend = FakeBackend::builder()
            .on("POST", "/services", json!({"service": created}))
            .on("GET", "/services/SNEW", json!({"service": created}))
            .start()
            .await;
        let client = backend.client();

        let result = call(
            all(),
            &client,
            "create_service",
            json!({"name": "Payments", "escalation_policy_id": "PESC", "description": "card flow"}),
        )
        .await;
        let id = json(&result)["id"].as_str().map(String::from).expect("id");

        let fetched = call(all(), &client, "get_service", json!({"service_id": id})).await;
        assert_eq!(json(&fetched)["name"], "Payments");
        assert_eq!(json(&fetched)["description"], "card flow");

        let requests = backend.requests();
        assert_eq!(
            requests[0].body,
            Some(json!({
                "service": {
                    "type": "service",
                    "name": "Payments",
                    "description": "card flow",
                    "escalation_policy": {"id": "PESC", "type": "escalation_policy_reference"}
                }
            }))
        );
    }

    #[tokio::test]
    async fn test_update_service_sends_only_given_fields() {
        let backend = FakeBackend::builder()
            .on("PUT", "/services/S1", json!({"service": {"id": "S1", "name": "Renamed"}}))
            .start()
            .await;
        let result = call(
            all(),
            &backend.client(),
            "update_service",
            json!({"service_id": "S1", "name": "Renamed"}),
        )
        .await;
        assert!(!is_error(&result));
        assert_eq!(
            backend.single_request().body,
            Some(json!({"service": {"type": "service", "name": "Renamed"}}))
        );
    }

    #[tokio::test]
    async fn test_create_service_requires_policy() {
        let backend = FakeBackend::builder().start().await;
        let result = call(all(), &backend.client(), "create_service", json!({"name": "x"})).await;
        assert_eq!(text(&result), "escalation_policy_id is required");
        assert!(backend.requests().is_empty());
    }
}
