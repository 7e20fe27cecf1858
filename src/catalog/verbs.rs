//! Verb classification for `verb_noun` tool names.
//!
//! The leading verb of a tool name determines whether the tool may be
//! registered as read-only, as a plain write, or must be flagged destructive.

/// Verbs of tools that never change backend state.
const READ_VERBS: &[&str] = &["get", "list"];

/// Verbs of tools that change backend state.
const WRITE_VERBS: &[&str] = &["create", "update", "add", "start", "manage", "append"];

/// Verbs of tools that irreversibly delete or unlink something.
const DESTRUCTIVE_VERBS: &[&str] = &["delete", "remove"];

/// What a name's verb says about the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbClass {
    Read,
    Write,
    Destructive,
}

/// Classify a tool name by its leading verb. `None` for unknown verbs.
pub fn classify(tool_name: &str) -> Option<VerbClass> {
    let verb = tool_name.split('_').next()?;
    if READ_VERBS.contains(&verb) {
        Some(VerbClass::Read)
    } else if WRITE_VERBS.contains(&verb) {
        Some(VerbClass::Write)
    } else if DESTRUCTIVE_VERBS.contains(&verb) {
        Some(VerbClass::Destructive)
    } else {
        None
    }
}
