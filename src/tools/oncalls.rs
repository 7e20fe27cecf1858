//! On-call lookup.

use futures::FutureExt;
use serde_json::Value;

use super::list_envelope;
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolSpec};
use crate::context::CallContext;
use crate::gateway::{PagerDutyClient, Query};

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "list_oncalls",
            "List On-Calls",
            "List current and upcoming on-call entries: who is on call now or within \
             a time range. Set earliest=true to get only the current person per \
             schedule. This is the main way to find who to contact for an incident.",
        )
        .param(ParamSpec::string(
            "time_zone",
            "IANA time zone for returned times (e.g. 'UTC')",
        ))
        .param(ParamSpec::string(
            "since",
            "Range start, ISO 8601. Defaults to now.",
        ))
        .param(ParamSpec::string(
            "until",
            "Range end, ISO 8601. Defaults to now.",
        ))
        .param(ParamSpec::boolean(
            "earliest",
            "Only the earliest on-call entry for each schedule",
        ))
        .param(ParamSpec::string(
            "schedule_ids",
            "Only these schedules, comma-separated (e.g. 'PSCHED1,PSCHED2')",
        ))
        .param(ParamSpec::string(
            "user_ids",
            "Only these users, comma-separated (e.g. 'PUSER1,PUSER2')",
        ))
        .param(ParamSpec::string(
            "escalation_policy_ids",
            "Only these escalation policies, comma-separated (e.g. 'PESC1,PESC2')",
        ))
        .param(ParamSpec::limit())
        .handler(list_oncalls),
    ]
}

fn list_oncalls(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        // `earliest=false` is the backend default, so only true is forwarded.
        let earliest = args.optional_bool("earliest")?.filter(|e| *e);
        let query = Query::new()
            .scalar_opt("time_zone", args.optional_str("time_zone")?)
            .scalar_opt("since", args.optional_str("since")?)
            .scalar_opt("until", args.optional_str("until")?)
            .scalar_opt("earliest", earliest)
            .array_joined("schedule_ids", args.optional_str("schedule_ids")?)
            .array_joined("user_ids", args.optional_str("user_ids")?)
            .array_joined(
                "escalation_policy_ids",
                args.optional_str("escalation_policy_ids")?,
            )
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/oncalls", &query).await?;
        Ok(list_envelope(body, "oncalls"))
    }
    .boxed()
}
