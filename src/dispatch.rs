//! Transport-independent dispatch: server metadata, tool listing and tool calls.
//!
//! Both front doors delegate here. Protocol faults (unknown tool) come back as
//! `McpError`; everything that goes wrong inside a tool becomes a tool-level
//! error result so the model can read it and recover.

use std::sync::Arc;
use std::time::Instant;

use rmcp::model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo, Tool};
use rmcp::ErrorData as McpError;
use serde_json::{Map, Value};

use crate::catalog::{error_result, Arguments, Catalog};
use crate::context::CallContext;
use crate::gateway::PagerDutyClient;

pub const SERVER_NAME: &str = "pagerduty-mcp";

const INSTRUCTIONS: &str = "\
PagerDuty MCP server. Tools are grouped by resource: incidents, services, teams, \
users, schedules, on-calls, escalation policies, event orchestrations, incident \
workflows, change events, alert grouping settings and status pages.

Start with get_user_data to learn whose token is in use. To find who to page, call \
list_oncalls with earliest=true. When triaging an incident, combine get_incident \
with get_past_incidents, get_related_incidents and list_incident_change_events.

List tools return {\"response\": [...]}. IDs in comma-separated parameters are \
given as 'ID1,ID2'. Times are ISO 8601.

Write tools are only present when the server was started with write tools enabled. \
Tools whose description starts with 'WARNING: DESTRUCTIVE' cannot be undone; \
confirm with the user before calling them.";

/// Shared, immutable dispatcher.
#[derive(Clone)]
pub struct Dispatcher {
    catalog: Arc<Catalog>,
    client: PagerDutyClient,
}

impl Dispatcher {
    pub fn new(catalog: Catalog, client: PagerDutyClient) -> Self {
        Self {
            catalog: Arc::new(catalog),
            client,
        }
    }

    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: SERVER_NAME.into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.catalog.tools().to_vec()
    }

    /// Run one tool. `Err` only for protocol faults.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
        ctx: CallContext,
    ) -> Result<CallToolResult, McpError> {
        let Some(def) = self.catalog.get(name) else {
            tracing::warn!(tool = %name, "Unknown tool requested");
            return Err(McpError::invalid_params(
                format!("tool '{name}' not found"),
                None,
            ));
        };

        let started = Instant::now();
        let caller_credential = ctx.has_override();
        let outcome = def
            .invoke(self.client.clone(), ctx, Arguments::new(arguments))
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                tracing::info!(
                    tool = %name,
                    duration_ms,
                    caller_credential,
                    "Tool call succeeded"
                );
                Ok(output.into_result())
            }
            Err(err) => {
                tracing::warn!(
                    tool = %name,
                    duration_ms,
                    caller_credential,
                    error = %err,
                    "Tool call failed"
                );
                Ok(error_result(&err))
            }
        }
    }
}
