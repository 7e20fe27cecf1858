//! Tool catalog: immutable registry of tool descriptors and their handlers.
//!
//! Each entry pairs a [`ToolSpec`] (name, title, description, parameters,
//! access class) with a [`Handler`]. The catalog is assembled once at
//! startup by [`CatalogBuilder::build`], which rejects duplicate names,
//! names outside the `verb_noun` convention, and access classes that
//! disagree with the name's verb. After that it is only read.

pub mod args;
pub mod params;
pub mod verbs;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use futures::future::BoxFuture;
use regex::Regex;
use rmcp::model::{CallToolResult, Content, Tool, ToolAnnotations};
use serde_json::Value;

use crate::context::CallContext;
use crate::error::{ServerError, ToolError};
use crate::gateway::PagerDutyClient;

pub use args::{Arg, Arguments};
pub use params::{ParamKind, ParamSpec};
pub use verbs::VerbClass;

/// Lowercase `verb_noun` with at least one noun segment.
fn tool_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z]+(_[a-z]+)+$").expect("valid regex"))
}

/// Whether a tool reads, writes, or irreversibly deletes backend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    Write,
    Destructive,
}

impl Access {
    pub fn is_write(self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

/// Successful handler output.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Serialized compactly as the text content of the result
    Json(Value),
    /// Plain confirmation or passthrough text
    Text(String),
}

impl ToolOutput {
    pub fn into_result(self) -> CallToolResult {
        let text = match self {
            ToolOutput::Json(value) => value.to_string(),
            ToolOutput::Text(text) => text,
        };
        CallToolResult::success(vec![Content::text(text)])
    }
}

/// Render a tool-level failure. Never a protocol fault.
pub fn error_result(err: &ToolError) -> CallToolResult {
    CallToolResult::error(vec![Content::text(err.to_string())])
}

pub type HandlerFuture = BoxFuture<'static, Result<ToolOutput, ToolError>>;

/// Stateless handler: all inputs arrive as arguments.
pub type Handler = fn(PagerDutyClient, CallContext, Arguments) -> HandlerFuture;

/// Declarative description of one tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
    pub access: Access,
    pub idempotent: bool,
}

impl ToolSpec {
    fn new(
        name: &'static str,
        title: &'static str,
        description: &'static str,
        access: Access,
    ) -> Self {
        Self {
            name,
            title,
            description,
            params: Vec::new(),
            access,
            idempotent: matches!(access, Access::ReadOnly),
        }
    }

    pub fn read(name: &'static str, title: &'static str, description: &'static str) -> Self {
        Self::new(name, title, description, Access::ReadOnly)
    }

    pub fn write(name: &'static str, title: &'static str, description: &'static str) -> Self {
        Self::new(name, title, description, Access::Write)
    }

    pub fn destructive(
        name: &'static str,
        title: &'static str,
        description: &'static str,
    ) -> Self {
        Self::new(name, title, description, Access::Destructive)
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Repeating the call with the same arguments has no further effect.
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    pub fn handler(self, handler: Handler) -> ToolDef {
        ToolDef {
            spec: self,
            handler,
        }
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|p| p.required)
    }

    /// Protocol-level descriptor for `tools/list`.
    pub fn descriptor(&self) -> Tool {
        let annotations = ToolAnnotations::with_title(self.title)
            .read_only(matches!(self.access, Access::ReadOnly))
            .destructive(matches!(self.access, Access::Destructive))
            .idempotent(self.idempotent)
            .open_world(true);
        Tool {
            name: self.name.into(),
            title: Some(self.title.into()),
            description: Some(self.description.into()),
            input_schema: Arc::new(params::input_schema(&self.params)),
            output_schema: None,
            annotations: Some(annotations),
            icons: None,
            meta: None,
        }
    }
}

/// A registered tool: spec plus handler.
#[derive(Clone)]
pub struct ToolDef {
    pub spec: ToolSpec,
    handler: Handler,
}

impl ToolDef {
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn invoke(
        &self,
        client: PagerDutyClient,
        ctx: CallContext,
        args: Arguments,
    ) -> HandlerFuture {
        (self.handler)(client, ctx, args)
    }
}

impl std::fmt::Debug for ToolDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDef").field("spec", &self.spec).finish()
    }
}

/// Collects tool definitions before validation.
#[derive(Default)]
pub struct CatalogBuilder {
    entries: Vec<ToolDef>,
}

impl CatalogBuilder {
    pub fn extend(mut self, defs: impl IntoIterator<Item = ToolDef>) -> Self {
        self.entries.extend(defs);
        self
    }

    /// Validate every entry and freeze the catalog.
    pub fn build(self) -> crate::Result<Catalog> {
        let mut index = HashMap::with_capacity(self.entries.len());
        for (i, def) in self.entries.iter().enumerate() {
            validate_spec(&def.spec)?;
            if index.insert(def.name(), i).is_some() {
                return Err(ServerError::DuplicateTool(def.name().to_string()));
            }
        }
        let descriptors = self.entries.iter().map(|d| d.spec.descriptor()).collect();
        Ok(Catalog {
            entries: self.entries,
            index,
            descriptors,
        })
    }
}

fn validate_spec(spec: &ToolSpec) -> crate::Result<()> {
    if !tool_name_pattern().is_match(spec.name) {
        return Err(ServerError::InvalidToolName(
            spec.name.to_string(),
            "expected lowercase verb_noun".to_string(),
        ));
    }
    let expected = match verbs::classify(spec.name) {
        Some(VerbClass::Read) => Access::ReadOnly,
        Some(VerbClass::Write) => Access::Write,
        Some(VerbClass::Destructive) => Access::Destructive,
        None => {
            return Err(ServerError::InvalidToolName(
                spec.name.to_string(),
                "unknown verb".to_string(),
            ));
        }
    };
    if spec.access != expected {
        return Err(ServerError::InvalidToolName(
            spec.name.to_string(),
            format!("verb implies {expected:?} but tool declares {:?}", spec.access),
        ));
    }
    Ok(())
}

/// Immutable, name-indexed tool registry.
pub struct Catalog {
    entries: Vec<ToolDef>,
    index: HashMap<&'static str, usize>,
    descriptors: Vec<Tool>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Descriptors in registration order.
    pub fn tools(&self) -> &[Tool] {
        &self.descriptors
    }

    pub fn entries(&self) -> &[ToolDef] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
