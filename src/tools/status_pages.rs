//! Status page tools: page metadata, posts and post updates.

use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use super::{list_envelope, unwrap_field, Reference};
use crate::catalog::{Arguments, HandlerFuture, ParamSpec, ToolDef, ToolOutput, ToolSpec};
use crate::context::CallContext;
use crate::error::ToolError;
use crate::gateway::{PagerDutyClient, Query};

const STATUS_PAGE_ID: ParamSpec =
    ParamSpec::string("status_page_id", "The status page ID").required();
const POST_ID: ParamSpec = ParamSpec::string("post_id", "The post ID").required();

pub fn read_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::read(
            "list_status_pages",
            "List Status Pages",
            "List public status pages, which tell customers and stakeholders about \
             service availability, incidents and maintenance.",
        )
        .param(ParamSpec::limit())
        .handler(list_status_pages),
        ToolSpec::read(
            "list_status_page_severities",
            "List Status Page Severities",
            "List the severity levels configured on a status page. A post's severity \
             decides how critical it looks to readers.",
        )
        .param(STATUS_PAGE_ID)
        .handler(list_status_page_severities),
        ToolSpec::read(
            "list_status_page_impacts",
            "List Status Page Impacts",
            "List the impact levels configured on a status page, such as major outage \
             or partial degradation.",
        )
        .param(STATUS_PAGE_ID)
        .handler(list_status_page_impacts),
        ToolSpec::read(
            "list_status_page_statuses",
            "List Status Page Statuses",
            "List the status values of a status page that track a post's lifecycle, \
             e.g. investigating, identified, monitoring, resolved.",
        )
        .param(STATUS_PAGE_ID)
        .handler(list_status_page_statuses),
        ToolSpec::read(
            "get_status_page_post",
            "Get Status Page Post",
            "Fetch one incident or maintenance post with its current status, severity \
             and timeline.",
        )
        .param(STATUS_PAGE_ID)
        .param(POST_ID)
        .handler(get_status_page_post),
        ToolSpec::read(
            "list_status_page_post_updates",
            "List Status Page Post Updates",
            "List the timeline updates of a post, from detection to resolution.",
        )
        .param(STATUS_PAGE_ID)
        .param(POST_ID)
        .handler(list_status_page_post_updates),
    ]
}

pub fn write_tools() -> Vec<ToolDef> {
    vec![
        ToolSpec::write(
            "create_status_page_post",
            "Create Status Page Post",
            "Publish an incident or maintenance post on a public status page. This is \
             visible to customers. Get valid status and severity IDs from \
             list_status_page_statuses and list_status_page_severities.",
        )
        .param(STATUS_PAGE_ID)
        .param(
            ParamSpec::string("post_type", "Kind of post")
                .one_of(&["incident", "maintenance"])
                .required(),
        )
        .param(ParamSpec::string("title", "Public title of the post").required())
        .param(ParamSpec::string("status_id", "Initial status ID"))
        .param(ParamSpec::string("severity_id", "Severity ID"))
        .param(ParamSpec::string(
            "starts_at",
            "Start, ISO 8601 (e.g. '2024-01-15T09:00:00Z'). For maintenance, when it begins.",
        ))
        .param(ParamSpec::string(
            "ends_at",
            "End, ISO 8601 (e.g. '2024-01-15T11:00:00Z'). For maintenance, expected completion.",
        ))
        .handler(create_status_page_post),
        ToolSpec::write(
            "create_status_page_post_update",
            "Add Status Page Update",
            "Add a public update to an existing post to report progress. Can also \
             move the post to a new status or severity and notify subscribers.",
        )
        .param(STATUS_PAGE_ID)
        .param(POST_ID)
        .param(ParamSpec::string("message", "Public update message").required())
        .param(ParamSpec::string("status_id", "New status ID"))
        .param(ParamSpec::string("severity_id", "New severity ID"))
        .param(ParamSpec::boolean(
            "notify_subscribers",
            "Notify page subscribers about this update (default false)",
        ))
        .handler(create_status_page_post_update),
    ]
}

fn list_status_pages(client: PagerDutyClient, ctx: CallContext, args: Arguments) -> HandlerFuture {
    async move {
        let query = Query::new().scalar_opt("limit", args.optional_int("limit")?);
        let body: Value = client.get_json(&ctx, "/status_pages", &query).await?;
        Ok(list_envelope(body, "status_pages"))
    }
    .boxed()
}

/// `GET /status_pages/{id}/{segment}`, enveloping the array under `segment`.
async fn list_page_collection(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
    segment: &'static str,
) -> Result<ToolOutput, ToolError> {
    let id = args.require_str("status_page_id")?;
    let body: Value = client
        .get_json(&ctx, &format!("/status_pages/{id}/{segment}"), &Query::new())
        .await?;
    Ok(list_envelope(body, segment))
}

fn list_status_page_severities(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    list_page_collection(client, ctx, args, "severities").boxed()
}

fn list_status_page_impacts(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    list_page_collection(client, ctx, args, "impacts").boxed()
}

fn list_status_page_statuses(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    list_page_collection(client, ctx, args, "statuses").boxed()
}

fn get_status_page_post(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let page = args.require_str("status_page_id")?;
        let post = args.require_str("post_id")?;
        let body: Value = client
            .get_json(&ctx, &format!("/status_pages/{page}/posts/{post}"), &Query::new())
            .await?;
        Ok(unwrap_field(body, "post"))
    }
    .boxed()
}

fn list_status_page_post_updates(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let page = args.require_str("status_page_id")?;
        let post = args.require_str("post_id")?;
        let body: Value = client
            .get_json(
                &ctx,
                &format!("/status_pages/{page}/posts/{post}/post_updates"),
                &Query::new(),
            )
            .await?;
        Ok(list_envelope(body, "post_updates"))
    }
    .boxed()
}

fn status_reference(id: &str) -> Reference {
    Reference::new(id, "status_page_status_reference")
}

fn severity_reference(id: &str) -> Reference {
    Reference::new(id, "status_page_severity_reference")
}

#[derive(Serialize)]
struct NewPost<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    post_type: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    starts_at: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ends_at: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<Reference>,
}

#[derive(Serialize)]
struct NewPostRequest<'a> {
    post: NewPost<'a>,
}

fn create_status_page_post(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let page = args.require_str("status_page_id")?;
        let request = NewPostRequest {
            post: NewPost {
                kind: "status_page_post",
                post_type: args.require_str("post_type")?,
                title: args.require_str("title")?,
                starts_at: args.optional_str("starts_at")?,
                ends_at: args.optional_str("ends_at")?,
                status: args.optional_str("status_id")?.map(status_reference),
                severity: args.optional_str("severity_id")?.map(severity_reference),
            },
        };
        let body: Value = client
            .post_json(&ctx, &format!("/status_pages/{page}/posts"), &request)
            .await?;
        Ok(unwrap_field(body, "post"))
    }
    .boxed()
}

#[derive(Serialize)]
struct NewPostUpdate<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notify_subscribers: Option<bool>,
}

#[derive(Serialize)]
struct NewPostUpdateRequest<'a> {
    post_update: NewPostUpdate<'a>,
}

fn create_status_page_post_update(
    client: PagerDutyClient,
    ctx: CallContext,
    args: Arguments,
) -> HandlerFuture {
    async move {
        let page = args.require_str("status_page_id")?;
        let post = args.require_str("post_id")?;
        let request = NewPostUpdateRequest {
            post_update: NewPostUpdate {
                kind: "status_page_post_update",
                message: args.require_str("message")?,
                status: args.optional_str("status_id")?.map(status_reference),
                severity: args.optional_str("severity_id")?.map(severity_reference),
                notify_subscribers: args.optional_bool("notify_subscribers")?,
            },
        };
        let body: Value = client
            .post_json(
                &ctx,
                &format!("/status_pages/{page}/posts/{post}/post_updates"),
                &request,
            )
            .await?;
        Ok(unwrap_field(body, "post_update"))
    }
    .boxed()
}
