//! Team tools, including membership changes.

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use super::{list_envelope, unwrap_field};
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolOutput, ToolSpec};
use crate::context::CallContext;
use crate::gateway::{PagerDutyClient, Query};

const TEAM_ID: ParamSpec = ParamSpec::string("team_id", "The team ID (e.g. 'PTEAM123')").required();
const USER_ID: ParamSpec = ParamSpec::string("user_id", "The user ID (e.g. 'PUSER123')").required();

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "list_teams",
            "List Teams",
            "List teams, the organizational units that group users. Use it to find \
             team IDs for filtering services, escalation policies or incidents.",
        )
        .param(ParamSpec::string("query", "Filter by name (partial match)"))
        .param(ParamSpec::limit())
        .handler(list_teams),
        ToolSpec::read(
            "get_team",
            "Get Team Details",
            "Fetch one team with its description and settings.",
        )
        .param(TEAM_ID)
        .handler(get_team),
        ToolSpec::read(
            "list_team_members",
            "List Team Members",
            "List the users in a team together with their role (manager, responder \
             or observer).",
        )
        .param(TEAM_ID)
        .param(ParamSpec::limit())
        .handler(list_team_members),
    ]
}

pub fn write_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::write(
            "create_team",
            "Create Team",
            "Create a team to group users. Teams can own services and escalation \
             policies and are used to filter incidents.",
        )
        .param(ParamSpec::string("name", "Team name (e.g. 'Platform Engineering')").required())
        .param(ParamSpec::string("description", "The team's purpose and responsibilities"))
        .handler(create_team),
        ToolSpec::write(
            "update_team",
            "Update Team",
            "Change a team's name or description.",
        )
        .param(TEAM_ID)
        .param(ParamSpec::string("name", "New name"))
        .param(ParamSpec::string("description", "New description"))
        .idempotent()
        .handler(update_team),
        ToolSpec::destructive(
            "delete_team",
            "Delete Team",
            "WARNING: DESTRUCTIVE - Permanently delete a team and detach it from every \
             service and escalation policy it is associated with. Cannot be undone.",
        )
        .param(TEAM_ID)
        .idempotent()
        .handler(delete_team),
        ToolSpec::write(
            "add_team_member",
            "Add Team Member",
            "Add a user to a team, optionally with a role that sets their permissions \
             within the team.",
        )
        .param(TEAM_ID)
        .param(USER_ID)
        .param(
            ParamSpec::string("role", "Role within the team")
                .one_of(&["manager", "responder", "observer"]),
        )
        .idempotent()
        .handler(add_team_member),
        ToolSpec::destructive(
            "remove_team_member",
            "Remove Team Member",
            "WARNING: DESTRUCTIVE - Remove a user from a team. The user loses any \
             team-specific permissions and may drop out of the team's schedules and \
             escalation policies.",
        )
        .param(TEAM_ID)
        .param(USER_ID)
        .idempotent()
        .handler(remove_team_member),
    ]
}

fn list_teams(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let query = Query::new()
            .scalar_opt("query", args.optional_str("query")?)
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/teams", &query).await?;
        Ok(list_envelope(body, "teams"))
    }
    .boxed()
}

fn get_team(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("team_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/teams/{id}"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "team"))
    }
    .boxed()
}

fn list_team_members(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("team_id")?;
        let query = Query::new().scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client
            .get_json(&ctx, &format!("/teams/{id}/members"), &query)
            .await?;
        Ok(list_envelope(body, "members"))
    }
    .boxed()
}

#[derive(Serialize)]
struct TeamFields<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Serialize)]
struct TeamRequest<'a> {
    team: TeamFields<'a>,
}

fn create_team(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let request = TeamRequest {
            team: TeamFields {
                kind: "team",
                name: Some(args.require_str("name")?),
                description: args.optional_str("description")?,
            },
        };
        let body: Value = client.post_json(&ctx, "/teams", &request).await?;
        Ok(unwrap_field(body, "team"))
    }
    .boxed()
}

fn update_team(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("team_id")?;
        let request = TeamRequest {
            team: TeamFields {
                kind: "team",
                name: args.optional_str("name")?,
                description: args.optional_str("description")?,
            },
        };
        let body: Value = client
            .put_json(&ctx, &format!("/teams/{id}"), &request)
            .await?;
        Ok(unwrap_field(body, "team"))
    }
    .boxed()
}

fn delete_team(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("team_id")?;
        client.delete(&ctx, &format!("/teams/{id}")).await?;
        Ok(ToolOutput::Text(format!("Team {id} deleted successfully")))
    }
    .boxed()
}

#[derive(Serialize)]
struct MemberRole<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

fn add_team_member(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let team = args.require_str("team_id")?;
        let user = args.require_str("user_id")?;
        let body = MemberRole {
            role: args.optional_str("role")?,
        };
        client
            .put(&ctx, &format!("/teams/{team}/users/{user}"), &body)
            .await?;
        Ok(ToolOutput::Text(format!("User {user} added to team {team}")))
    }
    .boxed()
}

fn remove_team_member(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let team = args.require_str("team_id")?;
        let user = args.require_str("user_id")?;
        client
            .delete(&ctx, &format!("/teams/{team}/users/{user}"))
            .await?;
        Ok(ToolOutput::Text(format!("User {user} removed from team {team}")))
    }
    .boxed()
}
