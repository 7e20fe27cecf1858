//! Escalation policy tools.

use futures::FutureExt;
use serde_json::Value;

use super::{list_envelope, unwrap_field};
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolSpec};
use crate::context::CallContext;
use crate::gateway::{PagerDutyClient, Query};

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "list_escalation_policies",
            "List Escalation Policies",
            "List escalation policies, which decide the order in which users and \
             schedules are notified about an incident. Every service has one. Use it \
             to find policy IDs for new services or to follow a notification chain.",
        )
        .param(ParamSpec::string("query", "Filter by name (partial match)"))
        .param(ParamSpec::string(
            "user_ids",
            "Only policies that include these users, comma-separated",
        ))
        .param(ParamSpec::string(
            "team_ids",
            "Only policies of these teams, comma-separated",
        ))
        .param(
            ParamSpec::string("sort_by", "Sort order").one_of(&["name", "name:asc", "name:desc"]),
        )
        .param(ParamSpec::limit())
        .handler(list_escalation_policies),
        ToolSpec::read(
            "get_escalation_policy",
            "Get Escalation Policy Details",
            "Fetch one escalation policy with every level and its targets.",
        )
        .param(
            ParamSpec::string("escalation_policy_id", "The policy ID (e.g. 'PESC123')").required(),
        )
        .handler(get_escalation_policy),
    ]
}

fn list_escalation_policies(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let query = Query::new()
            .scalar_opt("query", args.optional_str("query")?)
            .array_joined("user_ids", args.optional_str("user_ids")?)
            .array_joined("team_ids", args.optional_str("team_ids")?)
            .scalar_opt("sort_by", args.optional_str("sort_by")?)
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/escalation_policies", &query).await?;
        Ok(list_envelope(body, "escalation_policies"))
    }
    .boxed()
}

fn get_escalation_policy(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("escalation_policy_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/escalation_policies/{id}"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "escalation_policy"))
    }
    .boxed()
}
