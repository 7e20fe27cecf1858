//! Declarative parameter specs and their JSON Schema rendering.

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

impl ParamKind {
    fn schema_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// One parameter of a tool.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
    pub enum_values: &'static [&'static str],
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl ParamSpec {
    const fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            enum_values: &[],
            minimum: None,
            maximum: None,
        }
    }

    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub const fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Number, description)
    }

    pub const fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    /// Page-size parameter bounded to 1..=100.
    pub const fn limit() -> Self {
        Self::number("limit", "Maximum number of results to return (1-100)").range(1.0, 100.0)
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn one_of(mut self, values: &'static [&'static str]) -> Self {
        self.enum_values = values;
        self
    }

    pub const fn min(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub const fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    fn property(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.kind.schema_type()));
        prop.insert("description".into(), json!(self.description));
        if !self.enum_values.is_empty() {
            prop.insert("enum".into(), json!(self.enum_values));
        }
        if let Some(min) = self.minimum {
            prop.insert("minimum".into(), json!(min));
        }
        if let Some(max) = self.maximum {
            prop.insert("maximum".into(), json!(max));
        }
        Value::Object(prop)
    }
}

/// Render an ordered parameter list as an object JSON Schema.
pub fn input_schema(params: &[ParamSpec]) -> Map<String, Value> {
    let mut properties = Map::new();
    for param in params {
        properties.insert(param.name.to_string(), param.property());
    }

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));

    let required: Vec<&str> = params.iter().filter(|p| p.required).map(|p| p.name).collect();
    if !required.is_empty() {
        schema.insert("required".into(), json!(required));
    }
    schema
}
