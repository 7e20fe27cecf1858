//! PagerDuty tool definitions, grouped by REST resource.
//!
//! Each resource module exposes `read_tools()` and, where the resource can be
//! mutated, `write_tools()`. Handlers are plain `fn`s returning a boxed
//! future so the catalog can store them without captures.

pub mod alert_grouping;
pub mod change_events;
pub mod escalation_policies;
pub mod event_orchestrations;
pub mod incident_workflows;
pub mod incidents;
pub mod oncalls;
pub mod schedules;
pub mod services;
pub mod status_pages;
pub mod teams;
pub mod users;

use serde::Serialize;
use serde_json::Value;

use crate::catalog::{ToolDef, ToolOutput};

/// Every tool that never changes backend state.
pub fn read_tools() -> Vec<ToolDef> {
    [
        incidents::read_tools(),
        services::read_tools(),
        teams::read_tools(),
        users::read_tools(),
        schedules::read_tools(),
        oncalls::read_tools(),
        escalation_policies::read_tools(),
        event_orchestrations::read_tools(),
        incident_workflows::read_tools(),
        change_events::read_tools(),
        alert_grouping::read_tools(),
        status_pages::read_tools(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Every tool that creates, changes or deletes backend state.
pub fn write_tools() -> Vec<ToolDef> {
    [
        incidents::write_tools(),
        services::write_tools(),
        teams::write_tools(),
        schedules::write_tools(),
        event_orchestrations::write_tools(),
        incident_workflows::write_tools(),
        alert_grouping::write_tools(),
        status_pages::write_tools(),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Wrap the backend's array `field` as `{"response": [...]}`.
pub(crate) fn list_envelope(mut body: Value, field: &str) -> ToolOutput {
    let items = match body.get_mut(field).map(Value::take) {
        Some(Value::Array(items)) => Value::Array(items),
        _ => Value::Array(Vec::new()),
    };
    ToolOutput::Json(serde_json::json!({ "response": items }))
}

/// Return the single object under `field`, or `null` when absent.
pub(crate) fn unwrap_field(mut body: Value, field: &str) -> ToolOutput {
    ToolOutput::Json(body.get_mut(field).map(Value::take).unwrap_or(Value::Null))
}

/// `{"id": ..., "type": ...}` reference to another resource.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub(crate) struct Reference {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl Reference {
    pub fn new(id: impl Into<String>, kind: &'static str) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use rmcp::model::CallToolResult;
    use serde_json::Value;

    use crate::catalog::{error_result, Arguments, Catalog, ToolDef};
    use crate::context::CallContext;
    use crate::gateway::PagerDutyClient;

    /// Run one tool from `defs` and return the rendered result.
    pub async fn call(
        defs: Vec<ToolDef>,
        client: &PagerDutyClient,
        name: &str,
        args: Value,
    ) -> CallToolResult {
        let catalog = Catalog::builder().extend(defs).build().expect("catalog");
        let def = catalog.get(name).expect("tool registered");
        match def
            .invoke(client.clone(), CallContext::default(), Arguments::from(args))
            .await
        {
            Ok(output) => output.into_result(),
            Err(err) => error_result(&err),
        }
    }

    pub fn text(result: &CallToolResult) -> String {
        result
            .content
            .first()
            .and_then(|c| c.as_text())
            .map(|t| t.text.clone())
            .unwrap_or_default()
    }

    pub fn json(result: &CallToolResult) -> Value {
        serde_json::from_str(&text(result)).expect("json payload")
    }

    pub fn is_error(result: &CallToolResult) -> bool {
        result.is_error == Some(true)
    }
}
