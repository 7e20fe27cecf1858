//! Incident tools: lookup, history analysis, notes, creation and bulk updates.

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use super::{list_envelope, unwrap_field, Reference};
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolOutput, ToolSpec};
use crate::context::CallContext;
use crate::gateway::{split_ids, PagerDutyClient, Query};

const INCIDENT_ID: ParamSpec =
    ParamSpec::string("incident_id", "The incident ID (e.g. 'PABC123')").required();
const URGENCIES: &[&str] = &["high", "low"];

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "list_incidents",
            "List Incidents",
            "List PagerDuty incidents with optional filters. Use it to find open \
             (triggered or acknowledged) incidents, review recent history, or narrow \
             down to specific services, teams or assignees. To find historically \
             similar incidents for one incident use get_past_incidents instead.",
        )
        .param(
            ParamSpec::string(
                "statuses",
                "Incident statuses to include, comma-separated (e.g. 'triggered,acknowledged')",
            )
            .one_of(&["triggered", "acknowledged", "resolved"]),
        )
        .param(
            ParamSpec::string("date_range", "Predefined date range")
                .one_of(&["all", "past_month", "past_week"]),
        )
        .param(ParamSpec::string(
            "since",
            "Range start, ISO 8601 (e.g. '2024-01-15T10:00:00Z'). Pair with 'until'.",
        ))
        .param(ParamSpec::string(
            "until",
            "Range end, ISO 8601 (e.g. '2024-01-15T18:00:00Z'). Pair with 'since'.",
        ))
        .param(
            ParamSpec::string("urgencies", "Urgencies to include, comma-separated (e.g. 'high,low')")
                .one_of(URGENCIES),
        )
        .param(ParamSpec::string(
            "service_ids",
            "Only incidents on these services, comma-separated (e.g. 'PSVC1,PSVC2')",
        ))
        .param(ParamSpec::string(
            "team_ids",
            "Only incidents owned by these teams, comma-separated (e.g. 'PTEAM1,PTEAM2')",
        ))
        .param(ParamSpec::string(
            "user_ids",
            "Only incidents assigned to these users, comma-separated (e.g. 'PUSER1,PUSER2')",
        ))
        .param(ParamSpec::limit())
        .handler(list_incidents),
        ToolSpec::read(
            "get_incident",
            "Get Incident Details",
            "Fetch one incident by ID with its status, urgency, assignments and timestamps.",
        )
        .param(INCIDENT_ID)
        .handler(get_incident),
        ToolSpec::read(
            "get_outlier_incident",
            "Get Outlier Analysis",
            "Check whether an incident is unusual for its service compared with \
             historical patterns. Returns PagerDuty's machine-learning outlier analysis.",
        )
        .param(INCIDENT_ID)
        .param(ParamSpec::string(
            "since",
            "Start of the historical window, ISO 8601 (e.g. '2024-01-01T00:00:00Z')",
        ))
        .handler(get_outlier_incident),
        ToolSpec::read(
            "get_past_incidents",
            "Get Similar Past Incidents",
            "Find historical incidents similar to this one, matched on alert patterns \
             and metadata. Helpful for troubleshooting with prior resolutions. For \
             incidents happening at the same time use get_related_incidents.",
        )
        .param(INCIDENT_ID)
        .param(ParamSpec::limit())
        .handler(get_past_incidents),
        ToolSpec::read(
            "get_related_incidents",
            "Get Related Incidents",
            "Find incidents likely related to this one by timing and service \
             relationships. Useful to spot a wider outage. For historical look-alikes \
             use get_past_incidents.",
        )
        .param(INCIDENT_ID)
        .handler(get_related_incidents),
        ToolSpec::read(
            "list_incident_notes",
            "List Incident Notes",
            "List the notes responders have added to an incident: investigation \
             details, status updates and resolution information.",
        )
        .param(INCIDENT_ID)
        .handler(list_incident_notes),
    ]
}

pub fn write_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::write(
            "create_incident",
            "Create Incident",
            "Open a new incident on a service for a problem monitoring did not catch. \
             Notifications follow the service's escalation policy.",
        )
        .param(ParamSpec::string("title", "Short descriptive title").required())
        .param(
            ParamSpec::string("service_id", "Service to open the incident on (e.g. 'PSVC123')")
                .required(),
        )
        .param(ParamSpec::string("urgency", "Incident urgency").one_of(URGENCIES))
        .param(ParamSpec::string(
            "body",
            "Details: symptoms, impact and any useful context",
        ))
        .param(ParamSpec::string(
            "incident_key",
            "De-duplication key. Incidents with the same key on the same service are merged.",
        ))
        .handler(create_incident),
        ToolSpec::write(
            "manage_incidents",
            "Manage Incidents",
            "Apply the same change to one or more incidents in a single request: \
             acknowledge, resolve, change urgency, reassign, or escalate. Incidents \
             cannot be moved back to 'triggered'; use create_incident for new ones.",
        )
        .param(
            ParamSpec::string(
                "incident_ids",
                "Incidents to update, comma-separated (e.g. 'PABC123,PDEF456')",
            )
            .required(),
        )
        .param(ParamSpec::string("status", "New status").one_of(&["acknowledged", "resolved"]))
        .param(ParamSpec::string("urgency", "New urgency").one_of(URGENCIES))
        .param(ParamSpec::string(
            "assignee_id",
            "User to assign the incidents to (e.g. 'PUSER123')",
        ))
        .param(
            ParamSpec::number(
                "escalation_level",
                "Escalation level to move the incidents to in their escalation policy",
            )
            .min(1.0),
        )
        .idempotent()
        .handler(manage_incidents),
        ToolSpec::write(
            "add_responders",
            "Add Responders",
            "Ask additional users to join the response to an incident. Each user is \
             notified with a responder request.",
        )
        .param(INCIDENT_ID)
        .param(
            ParamSpec::string(
                "responder_ids",
                "Users to request, comma-separated (e.g. 'PUSER1,PUSER2')",
            )
            .required(),
        )
        .param(ParamSpec::string(
            "message",
            "Why these responders are needed",
        ))
        .handler(add_responders),
        ToolSpec::write(
            "add_note_to_incident",
            "Add Incident Note",
            "Record investigation progress, findings or resolution details as a note \
             on an incident. Notes are visible to all responders and kept in the \
             incident timeline.",
        )
        .param(INCIDENT_ID)
        .param(ParamSpec::string("note", "Note text").required())
        .handler(add_note_to_incident),
    ]
}

fn list_incidents(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let query = Query::new()
            .array_joined("statuses", args.optional_str("statuses")?)
            .scalar_opt("date_range", args.optional_str("date_range")?)
            .scalar_opt("since", args.optional_str("since")?)
            .scalar_opt("until", args.optional_str("until")?)
            .array_joined("urgencies", args.optional_str("urgencies")?)
            .array("service_ids", args.optional_str("service_ids")?)
            .array("team_ids", args.optional_str("team_ids")?)
            .array("user_ids", args.optional_str("user_ids")?)
            .scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/incidents", &query).await?;
        Ok(list_envelope(body, "incidents"))
    }
    .boxed()
}

fn get_incident(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("incident_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/incidents/{id}"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "incident"))
    }
    .boxed()
}

fn get_outlier_incident(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("incident_id")?;
        let query = Query::new().scalar_opt("since", args.optional_str("since")?);
        let body: Value = client
            .get_json(&ctx, &format!("/incidents/{id}/outlier_incident"), &query)
            .await?;
        Ok(ToolOutput::Json(body))
    }
    .boxed()
}

fn get_past_incidents(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("incident_id")?;
        let query = Query::new().scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client
            .get_json(&ctx, &format!("/incidents/{id}/past_incidents"), &query)
            .await?;
        Ok(ToolOutput::Json(body))
    }
    .boxed()
}

fn get_related_incidents(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("incident_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/incidents/{id}/related_incidents"), &Query::new())
            .await?;
        Ok(ToolOutput::Json(body))
    }
    .boxed()
}

fn list_incident_notes(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("incident_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/incidents/{id}/notes"), &Query::new())
            .await?;
        Ok(list_envelope(body, "notes"))
    }
    .boxed()
}

#[derive(Serialize)]
struct IncidentBody<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    details: &'a str,
}

#[derive(Serialize)]
struct NewIncident<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: &'a str,
    service: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    urgency: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<IncidentBody<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    incident_key: Option<&'a str>,
}

#[derive(Serialize)]
struct NewIncidentRequest<'a> {
    incident: NewIncident<'a>,
}

fn create_incident(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let title = args.require_str("title")?;
        let service_id = args.require_str("service_id")?;
        let request = NewIncidentRequest {
            incident: NewIncident {
                kind: "incident",
                title,
                service: Reference::new(service_id, "service_reference"),
                urgency: args.optional_str("urgency")?,
                body: args.optional_str("body")?.map(|details| IncidentBody {
                    kind: "incident_body",
                    details,
                }),
                incident_key: args.optional_str("incident_key")?,
            },
        };
        let body: Value = client.post_json(&ctx, "/incidents", &request).await?;
        Ok(unwrap_field(body, "incident"))
    }
    .boxed()
}

#[derive(Serialize)]
struct Assignment {
    at: String,
    assignee: Reference,
}

#[derive(Serialize)]
struct IncidentChange<'a> {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    urgency: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    escalation_level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignments: Option<Vec<Assignment>>,
}

#[derive(Serialize)]
struct BulkIncidentChange<'a> {
    incidents: Vec<IncidentChange<'a>>,
}

/// One PUT carrying the same sparse change for every ID. Partial failure is
/// whatever the backend reports for the batch.
fn manage_incidents(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let ids = split_ids(args.require_str("incident_ids")?);
        let status = args.optional_str("status")?;
        let urgency = args.optional_str("urgency")?;
        let assignee = args.optional_str("assignee_id")?;
        let escalation_level = args.optional_int("escalation_level")?.filter(|l| *l > 0);
        let assigned_at = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        let request = BulkIncidentChange {
            incidents: ids
                .into_iter()
                .map(|id| IncidentChange {
                    id,
                    kind: "incident_reference",
                    status,
                    urgency,
                    escalation_level,
                    assignments: assignee.map(|user| {
                        vec![Assignment {
                            at: assigned_at.clone(),
                            assignee: Reference::new(user, "user_reference"),
                        }]
                    }),
                })
                .collect(),
        };
        let body: Value = client.put_json(&ctx, "/incidents", &request).await?;
        Ok(list_envelope(body, "incidents"))
    }
    .boxed()
}

#[derive(Serialize)]
struct ResponderRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    responder_request_targets: Vec<Reference>,
}

fn add_responders(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let id = args.require_str("incident_id")?;
        let responders = args.require_str("responder_ids")?;
        let request = ResponderRequest {
            message: args.optional_str("message")?,
            responder_request_targets: split_ids(responders)
                .into_iter()
                .map(|user| Reference::new(user, "user_reference"))
                .collect(),
        };
        let raw = client
            .post(&ctx, &format!("/incidents/{id}/responder_requests"), &request)
            .await?;
        Ok(ToolOutput::Text(String::from_utf8_lossy(&raw).into_owned()))
    }
    .boxed()
}

#[derive(Serialize)]
struct NoteContent<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct NewNoteRequest<'a> {
    note: NoteContent<'a>,
}

fn add_note_to_incident(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let id = args.require_str("incident_id")?;
        let content = args.require_str("note")?;
        let request = NewNoteRequest {
            note: NoteContent { content },
        };
        let body: Value = client
            .post_json(&ctx, &format!("/incidents/{id}/notes"), &request)
            .await?;
        Ok(unwrap_field(body, "note"))
    }
    .boxed()
}
