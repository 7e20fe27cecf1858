//! Incident workflow tools.

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
            "list_incident_workflows",
            "List Incident Workflows",
            "List incident workflows: automated sequences of actions that run on an \
             incident, such as opening a chat channel, notifying stakeholders or \
             running diagnostics.",
        )
        .param(ParamSpec::string("query", "Filter by name (partial match)"))
        .param(ParamSpec::limit())
        .handler(list_incident_workflows),
        ToolSpec::read(
            "get_incident_workflow",
            "Get Incident Workflow",
            "Fetch one incident workflow with its trigger conditions and steps.",
        )
        .param(ParamSpec::string("workflow_id", "The workflow ID (e.g. 'PWFLOW123')").required())
        .handler(get_incident_workflow),
    ]
}

pub fn write_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::write(
            "start_incident_workflow",
            "Start Incident Workflow",
            "Run an incident workflow on one incident now. The workflow executes its \
             configured steps, for example creating a war room or notifying \
             stakeholders.",
        )
        .param(ParamSpec::string("workflow_id", "Workflow to run (e.g. 'PWFLOW123')").required())
        .param(ParamSpec::string("incident_id", "Incident to run it on (e.g. 'PABC123')").required())
        .handler(start_incident_workflow),
    ]
}

fn list_incident_workflows(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let query = Query::new()
            .scalar_opt("query", args.optional_str("query")?)
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/incident_workflows", &query).await?;
        Ok(list_envelope(body, "incident_workflows"))
    }
    .boxed()
}

fn get_incident_workflow(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("workflow_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/incident_workflows/{id}"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "incident_workflow"))
    }
    .boxed()
}

#[derive(Serialize)]
struct WorkflowInstance {
    incident: Reference,
    workflow: Reference,
}

#[derive(Serialize)]
struct WorkflowInstanceRequest {
    incident_workflow_instance: WorkflowInstance,
}

fn start_incident_workflow(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let workflow = args.require_str("workflow_id")?;
        let incident = args.require_str("incident_id")?;
        let request = WorkflowInstanceRequest {
            incident_workflow_instance: WorkflowInstance {
                incident: Reference::new(incident, "incident_reference"),
                workflow: Reference::new(workflow, "incident_workflow_reference"),
            },
        };
        let body: Value = client
            .post_json(&ctx, &format!("/incident_workflows/{workflow}/instances"), &request)
            .await?;
        Ok(unwrap_field(body, "incident_workflow_instance"))
    }
    .boxed()
}
