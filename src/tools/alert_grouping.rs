//! Alert grouping setting tools.

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use super::{list_envelope, unwrap_field, Reference};
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolOutput, ToolSpec};
use crate::context::CallContext;
use crate::gateway::{split_ids, PagerDutyClient, Query};

const SETTING_ID: ParamSpec =
    ParamSpec::string("setting_id", "The alert grouping setting ID").required();
const GROUPING_TYPES: &[&str] = &["time", "intelligent", "content_based"];

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "list_alert_grouping_settings",
            "List Alert Grouping Settings",
            "List alert grouping settings. Grouping folds related alerts into one \
             incident to cut noise, by time window, by machine learning or by \
             matching content.",
        )
        .param(ParamSpec::string("service_ids", "Only these services, comma-separated"))
        .param(ParamSpec::limit())
        .handler(list_alert_grouping_settings),
        ToolSpec::read(
            "get_alert_grouping_setting",
            "Get Alert Grouping Setting",
            "Fetch one alert grouping setting with its type and the services it \
             applies to.",
        )
        .param(SETTING_ID)
        .handler(get_alert_grouping_setting),
    ]
}

pub fn write_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::write(
            "create_alert_grouping_setting",
            "Create Alert Grouping Setting",
            "Create an alert grouping setting for one or more services. Use 'time' \
             for a fixed window, 'intelligent' for machine-learned grouping, or \
             'content_based' to group on matching fields.",
        )
        .param(ParamSpec::string("name", "Name of the setting").required())
        .param(
            ParamSpec::string(
                "service_ids",
                "Services it applies to, comma-separated (e.g. 'PSVC1,PSVC2')",
            )
            .required(),
        )
        .param(ParamSpec::string("type", "Grouping strategy").one_of(GROUPING_TYPES).required())
        .param(
            ParamSpec::number("timeout", "Grouping window in minutes, for the 'time' type")
                .range(1.0, 1440.0),
        )
        .handler(create_alert_grouping_setting),
        ToolSpec::write(
            "update_alert_grouping_setting",
            "Update Alert Grouping Setting",
            "Rename an alert grouping setting or change its strategy or window.",
        )
        .param(SETTING_ID)
        .param(ParamSpec::string("name", "New name"))
        .param(ParamSpec::string("type", "New grouping strategy").one_of(GROUPING_TYPES))
        .param(ParamSpec::number("timeout", "New window in minutes").range(1.0, 1440.0))
        .idempotent()
        .handler(update_alert_grouping_setting),
        ToolSpec::destructive(
            "delete_alert_grouping_setting",
            "Delete Alert Grouping Setting",
            "WARNING: DESTRUCTIVE - Permanently delete an alert grouping setting. \
             Its services fall back to their default grouping behavior.",
        )
        .param(SETTING_ID)
        .idempotent()
        .handler(delete_alert_grouping_setting),
    ]
}

fn list_alert_grouping_settings(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let query = Query::new()
            .array_joined("service_ids", args.optional_str("service_ids")?)
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client
            .get_json(&ctx, "/alert_grouping_settings", &query)
            .await?;
        Ok(list_envelope(body, "alert_grouping_settings"))
    }
    .boxed()
}

fn get_alert_grouping_setting(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("setting_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/alert_grouping_settings/{id}"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "alert_grouping_setting"))
    }
    .boxed()
}

#[derive(Serialize)]
struct GroupingConfig<'a> {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<i64>,
}

impl<'a> GroupingConfig<'a> {
    /// `None` when neither field is given.
    fn sparse(kind: Option<&'a str>, timeout: Option<i64>) -> Option<Self> {
        (kind.is_some() || timeout.is_some()).then_some(Self { kind, timeout })
    }
}

#[derive(Serialize)]
struct GroupingSetting<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    services: Option<Vec<Reference>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<GroupingConfig<'a>>,
}

#[derive(Serialize)]
struct GroupingSettingRequest<'a> {
    alert_grouping_setting: GroupingSetting<'a>,
}

fn create_alert_grouping_setting(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let name = args.require_str("name")?;
        let services = split_ids(args.require_str("service_ids")?)
            .into_iter()
            .map(|id| Reference::new(id, "service_reference"))
            .collect();
        let kind = args.require_str("type")?;
        let request = GroupingSettingRequest {
            alert_grouping_setting: GroupingSetting {
                kind: "alert_grouping_setting",
                name: Some(name),
                services: Some(services),
                config: GroupingConfig::sparse(Some(kind), args.optional_int("timeout")?),
            },
        };
        let body: Value = client
            .post_json(&ctx, "/alert_grouping_settings", &request)
            .await?;
        Ok(unwrap_field(body, "alert_grouping_setting"))
    }
    .boxed()
}

fn update_alert_grouping_setting(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("setting_id")?;
        let request = GroupingSettingRequest {
            alert_grouping_setting: GroupingSetting {
                kind: "alert_grouping_setting",
                name: args.optional_str("name")?,
                services: None,
                config: GroupingConfig::sparse(
                    args.optional_str("type")?,
                    args.optional_int("timeout")?,
                ),
            },
        };
        let body: Value = client
            .put_json(&ctx, &format!("/alert_grouping_settings/{id}"), &request)
            .await?;
        Ok(unwrap_field(body, "alert_grouping_setting"))
    }
    .boxed()
}

fn delete_alert_grouping_setting(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("setting_id")?;
        client
            .delete(&ctx, &format!("/alert_grouping_settings/{id}"))
            .await?;
        Ok(ToolOutput::Text(format!(
            "Alert grouping setting {id} deleted successfully"
        )))
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
    async fn test_create_splits_services() {
        let backend = FakeBackend::builder()
            .on(
                "POST",
                "/alert_grouping_settings",
                json!({"alert_grouping_setting": {"id": "AG1"}}),
            )
            .start()
            .await;
        let result = call(
            all(),
            &backend.client(),
            "create_alert_grouping_setting",
            json!({"name": "db noise", "service_ids": "S1, S2", "type": "time", "timeout": 15}),
        )
        .await;
        assert_eq!(json(&result), json!({"id": "AG1"}));
        assert_eq!(
            backend.single_request().body,
            Some(json!({
                "alert_grouping_setting": {
                    "type": "alert_grouping_setting",
                    "name": "db noise",
                    "services": [
                        {"id": "S1", "type": "service_reference"},
                        {"id": "S2", "type": "service_reference"}
                    ],
                    "config": {"type": "time", "timeout": 15}
                }
            }))
        );
    }

    #[tokio::test]
    async fn test_update_without_config_fields_omits_config() {
        let backend = FakeBackend::builder().start().await;
        call(
            all(),
            &backend.client(),
            "update_alert_grouping_setting",
            json!({"setting_id": "AG1", "name": "renamed"}),
        )
        .await;
        assert_eq!(
            backend.single_request().body,
            Some(json!({"alert_grouping_setting": {"type": "alert_grouping_setting", "name": "renamed"}}))
        );
    }

    #[tokio::test]
    async fn test_update_timeout_only() {
        let backend = FakeBackend::builder().start().await;
        call(
            all(),
            &backend.client(),
            "update_alert_grouping_setting",
            json!({"setting_id": "AG1", "timeout": 30}),
        )
        .await;
        let body = backend.single_request().body.expect("body");
        assert_eq!(body["alert_grouping_setting"]["config"], json!({"timeout": 30}));
    }

    #[tokio::test]
    async fn test_delete_setting() {
        let backend = FakeBackend::builder()
            .on_status("DELETE", "/alert_grouping_settings/AG1", 204, "")
            .start()
            .await;
        let result = call(
            all(),
            &backend.client(),
            "delete_alert_grouping_setting",
            json!({"setting_id": "AG1"}),
        )
        .await;
        assert!(!is_error(&result));
        assert_eq!(text(&result), "Alert grouping setting AG1 deleted successfully");
    }

    #[tokio::test]
    async fn test_list_settings_joined_services() {
        let backend = FakeBackend::builder().start().await;
        let result = call(
            all(),
            &backend.client(),
            "list_alert_grouping_settings",
            json!({"service_ids": "S1,S2"}),
        )
        .await;
        assert_eq!(json(&result), json!({"response": []}));
        assert_eq!(backend.single_request().query_values("service_ids[]"), vec!["S1,S2"]);
    }
}
