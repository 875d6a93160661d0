//! Capabilities: the operations a remote session lets the agent perform.
//!
//! A capability is discovered at runtime from the remote server's tool
//! listing. Its parameter schema is resolved once, at discovery, into an
//! ordered list of [`Parameter`]s; everything downstream (prompt rendering,
//! argument binding) works from that list and never touches raw JSON Schema.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::CapabilityError;

/// The declared kind of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Array,
    /// Any other declared type, or `None` when the schema declares none.
    Other(Option<String>),
}

impl ParamKind {
    /// Map a JSON Schema `type` name onto a kind.
    pub fn from_type_name(type_name: Option<&str>) -> Self {
        match type_name {
            Some("string") => Self::String,
            Some("integer") => Self::Integer,
            Some("number") => Self::Number,
            Some("array") => Self::Array,
            other => Self::Other(other.map(str::to_string)),
        }
    }

    /// The name used when describing the parameter to the oracle.
    pub fn type_name(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Array => "array",
            Self::Other(Some(name)) => name,
            Self::Other(None) => "unknown",
        }
    }
}

/// One declared parameter of a capability.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name as declared by the remote schema
    pub name: String,

    /// Declared kind
    pub kind: ParamKind,

    /// Name of the nested structure this parameter refers to, if any
    pub reference: Option<String>,

    /// Resolved fields of the nested structure, in declaration order
    pub fields: Vec<Parameter>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            reference: None,
            fields: Vec::new(),
        }
    }

    /// A parameter whose value is a named nested structure.
    pub fn nested(name: impl Into<String>, reference: impl Into<String>, fields: Vec<Parameter>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Other(Some("object".into())),
            reference: Some(reference.into()),
            fields,
        }
    }

    /// Whether this parameter carries a resolved nested structure.
    pub fn is_nested(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// A remotely invocable operation with its resolved parameter schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
}

impl Capability {
    /// The single nested structure this capability takes, when its schema
    /// is expressed as one `input`-style parameter.
    pub fn nested_input(&self) -> Option<&Parameter> {
        match self.parameters.as_slice() {
            [only] if only.is_nested() => Some(only),
            _ => None,
        }
    }

    /// Render `name(param: type, ...)`, flattening nested structures into
    /// their fields.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .flat_map(|p| {
                if p.is_nested() {
                    p.fields.iter().collect::<Vec<_>>()
                } else {
                    vec![p]
                }
            })
            .map(|p| format!("{}: {}", p.name, p.kind.type_name()))
            .collect();

        if params.is_empty() {
            format!("{}(no parameters)", self.name)
        } else {
            format!("{}({})", self.name, params.join(", "))
        }
    }
}

/// A typed value produced by argument binding.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Text(String),
    Integer(i64),
    Float(f64),
    IntegerList(Vec<i64>),
    Structured(BoundArguments),
}

impl BoundValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Integer(i) => serde_json::json!(i),
            Self::Float(f) => serde_json::json!(f),
            Self::IntegerList(items) => serde_json::json!(items),
            Self::Structured(fields) => fields.to_json(),
        }
    }
}

/// Arguments bound to a capability schema, one entry per declared
/// parameter, in schema declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArguments {
    entries: Vec<(String, BoundValue)>,
}

impl BoundArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: BoundValue) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoundValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The JSON object sent over the wire.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(n, v)| (n.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl std::fmt::Display for BoundArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// A tool as listed by the remote session, before schema resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// The raw result of a remote invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResult(pub serde_json::Value);

/// A live session with a remote capability server.
///
/// Sessions are single-owner: one agent run opens one session, drives it
/// sequentially, and closes it when the run ends.
#[async_trait]
pub trait CapabilitySession: Send {
    /// Enumerate every tool the server exposes.
    async fn list_tools(&mut self) -> std::result::Result<Vec<ToolDescriptor>, CapabilityError>;

    /// Invoke a tool with bound arguments.
    async fn call_tool(
        &mut self,
        name: &str,
        arguments: &BoundArguments,
    ) -> std::result::Result<RemoteResult, CapabilityError>;

    /// Release the session. Must be safe to call more than once.
    async fn close(&mut self);
}

/// Opens a fresh [`CapabilitySession`] for each run.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(&self) -> std::result::Result<Box<dyn CapabilitySession>, CapabilityError>;
}
