//! Typed access to the untyped call-argument map.
//!
//! Lookups never panic and never coerce: a value is either present with the
//! expected JSON type, absent (missing, `null` or empty string), or present
//! with the wrong type.

use serde_json::{Map, Value};

use crate::error::ToolError;

/// Outcome of a single argument lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg<T> {
    Present(T),
    Absent,
    WrongType,
}

/// Arguments of one tool call. Unknown keys are ignored.
#[derive(Debug, Clone, Default)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new(map: Option<Map<String, Value>>) -> Self {
        Self(map.unwrap_or_default())
    }

    pub fn string(&self, name: &str) -> Arg<&str> {
        match self.0.get(name) {
            None | Some(Value::Null) => Arg::Absent,
            Some(Value::String(s)) if s.is_empty() => Arg::Absent,
            Some(Value::String(s)) => Arg::Present(s.as_str()),
            Some(_) => Arg::WrongType,
        }
    }

    pub fn number(&self, name: &str) -> Arg<f64> {
        match self.0.get(name) {
            None | Some(Value::Null) => Arg::Absent,
            Some(Value::Number(n)) => n.as_f64().map_or(Arg::WrongType, Arg::Present),
            Some(_) => Arg::WrongType,
        }
    }

    pub fn boolean(&self, name: &str) -> Arg<bool> {
        match self.0.get(name) {
            None | Some(Value::Null) => Arg::Absent,
            Some(Value::Bool(b)) => Arg::Present(*b),
            Some(_) => Arg::WrongType,
        }
    }

    pub fn require_str(&self, name: &str) -> Result<&str, ToolError> {
        match self.string(name) {
            Arg::Present(s) => Ok(s),
            Arg::Absent => Err(ToolError::MissingArgument(name.to_string())),
            Arg::WrongType => Err(ToolError::WrongType(name.to_string(), "string")),
        }
    }

    pub fn optional_str(&self, name: &str) -> Result<Option<&str>, ToolError> {
        match self.string(name) {
            Arg::Present(s) => Ok(Some(s)),
            Arg::Absent => Ok(None),
            Arg::WrongType => Err(ToolError::WrongType(name.to_string(), "string")),
        }
    }

    /// Numeric argument truncated toward zero.
    pub fn optional_int(&self, name: &str) -> Result<Option<i64>, ToolError> {
        match self.number(name) {
            Arg::Present(n) => Ok(Some(n.trunc() as i64)),
            Arg::Absent => Ok(None),
            Arg::WrongType => Err(ToolError::WrongType(name.to_string(), "number")),
        }
    }

    pub fn optional_bool(&self, name: &str) -> Result<Option<bool>, ToolError> {
        match self.boolean(name) {
            Arg::Present(b) => Ok(Some(b)),
            Arg::Absent => Ok(None),
            Arg::WrongType => Err(ToolError::WrongType(name.to_string(), "boolean")),
        }
    }
}

impl From<Value> for Arguments {
    /// Non-object values yield an empty argument map.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}
