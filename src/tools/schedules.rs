//! Schedule tools: lookup, rendered rotations, overrides and metadata edits.

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use super::{list_envelope, unwrap_field, Reference};
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolSpec};
use crate::context::CallContext;
use crate::gateway::{PagerDutyClient, Query};

const SCHEDULE_ID: ParamSpec =
    ParamSpec::string("schedule_id", "The schedule ID (e.g. 'PSCHED123')").required();
const SINCE: ParamSpec = ParamSpec::string(
    "since",
    "Range start, ISO 8601 (e.g. '2024-01-15T00:00:00Z')",
);
const UNTIL: ParamSpec = ParamSpec::string(
    "until",
    "Range end, ISO 8601 (e.g. '2024-01-22T00:00:00Z')",
);

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "list_schedules",
            "List Schedules",
            "List on-call schedules. Schedules define the rotations that decide who \
             is on call at a given time. Use it to find schedule IDs for on-call \
             lookups.",
        )
        .param(ParamSpec::string("query", "Filter by name (partial match)"))
        .param(ParamSpec::limit())
        .handler(list_schedules),
        ToolSpec::read(
            "get_schedule",
            "Get Schedule Details",
            "Fetch one schedule with its rotation layers. Pass a time range to have \
             the on-call periods rendered for that window.",
        )
        .param(SCHEDULE_ID)
        .param(SINCE)
        .param(UNTIL)
        .handler(get_schedule),
        ToolSpec::read(
            "list_schedule_users",
            "List Schedule Users",
            "List the users that take part in a schedule's rotation within a time \
             range. Shows who is or will be on call.",
        )
        .param(SCHEDULE_ID)
        .param(SINCE)
        .param(UNTIL)
        .handler(list_schedule_users),
    ]
}

pub fn write_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::write(
            "create_schedule",
            "Create Schedule",
            "Create an empty on-call schedule. Rotation layers are not part of this \
             call and must be added separately.",
        )
        .param(ParamSpec::string("name", "Schedule name (e.g. 'Primary On-Call')").required())
        .param(
            ParamSpec::string("time_zone", "IANA time zone (e.g. 'Europe/London', 'UTC')")
                .required(),
        )
        .param(ParamSpec::string("description", "Purpose and coverage of the schedule"))
        .handler(create_schedule),
        ToolSpec::write(
            "create_schedule_override",
            "Create Schedule Override",
            "Put a user on call for a fixed window, taking precedence over the normal \
             rotation. Use it for vacation cover and shift swaps.",
        )
        .param(SCHEDULE_ID)
        .param(
            ParamSpec::string("user_id", "User who will be on call during the override")
                .required(),
        )
        .param(
            ParamSpec::string("start", "Override start, ISO 8601 (e.g. '2024-01-15T09:00:00Z')")
                .required(),
        )
        .param(
            ParamSpec::string("end", "Override end, ISO 8601 (e.g. '2024-01-15T17:00:00Z')")
                .required(),
        )
        .handler(create_schedule_override),
        ToolSpec::write(
            "update_schedule",
            "Update Schedule",
            "Change a schedule's name, description or time zone. Rotation layers are \
             left untouched.",
        )
        .param(SCHEDULE_ID)
        .param(ParamSpec::string("name", "New name"))
        .param(ParamSpec::string("description", "New description"))
        .param(ParamSpec::string("time_zone", "New IANA time zone (e.g. 'America/New_York')"))
        .idempotent()
        .handler(update_schedule),
    ]
}

fn range_query(args: &Arguments) -> Result<Query, crate::error::ToolError> {
    Ok(Query::new()
        .scalar_opt("since", args.optional_str("since")?)
        .scalar_opt("until", args.optional_str("until")?))
}

fn list_schedules(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let query = Query::new()
            .scalar_opt("query", args.optional_str("query")?)
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/schedules", &query).await?;
        Ok(list_envelope(body, "schedules"))
    }
    .boxed()
}

fn get_schedule(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("schedule_id")?;
        let query = range_query(&args)?;
        let body: Value = client
            .get_json(&ctx, &format!("/schedules/{id}"), &query)
            .await?;
        Ok(unwrap_field(body, "schedule"))
    }
    .boxed()
}

fn list_schedule_users(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("schedule_id")?;
        let query = range_query(&args)?;
        let body: Value = client
            .get_json(&ctx, &format!("/schedules/{id}/users"), &query)
            .await?;
        Ok(list_envelope(body, "users"))
    }
    .boxed()
}

#[derive(Serialize)]
struct NewSchedule<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    time_zone: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    schedule_layers: Vec<Value>,
}

#[derive(Serialize)]
struct ScheduleChanges<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<&'a str>,
}

#[derive(Serialize)]
struct ScheduleRequest<T> {
    schedule: T,
}

#[derive(Serialize)]
struct Override<'a> {
    start: &'a str,
    end: &'a str,
    user: Reference,
}

#[derive(Serialize)]
struct OverrideRequest<'a> {
    #[serde(rename = "override")]
    entry: Override<'a>,
}

fn create_schedule(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let request = ScheduleRequest {
            schedule: NewSchedule {
                kind: "schedule",
                name: args.require_str("name")?,
                time_zone: args.require_str("time_zone")?,
                description: args.optional_str("description")?,
                schedule_layers: Vec::new(),
            },
        };
        let body: Value = client.post_json(&ctx, "/schedules", &request).await?;
        Ok(unwrap_field(body, "schedule"))
    }
    .boxed()
}

fn create_schedule_override(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("schedule_id")?;
        let request = OverrideRequest {
            entry: Override {
                user: Reference::new(args.require_str("user_id")?, "user_reference"),
                start: args.require_str("start")?,
                end: args.require_str("end")?,
            },
        };
        let body: Value = client
            .post_json(&ctx, &format!("/schedules/{id}/overrides"), &request)
            .await?;
        Ok(unwrap_field(body, "override"))
    }
    .boxed()
}

fn update_schedule(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("schedule_id")?;
        let request = ScheduleRequest {
            schedule: ScheduleChanges {
                kind: "schedule",
                name: args.optional_str("name")?,
                description: args.optional_str("description")?,
                time_zone: args.optional_str("time_zone")?,
            },
        };
        let body: Value = client
            .put_json(&ctx, &format!("/schedules/{id}"), &request)
            .await?;
        Ok(unwrap_field(body, "schedule"))
    }
    .boxed()
}
