//! Resolve a tool's JSON Schema into an ordered parameter list.
//!
//! Python MCP servers describe a pydantic model argument as
//! `{"properties": {"input": {"$ref": "#/$defs/CreateTodoInput"}}, "$defs": {...}}`.
//! Such a property becomes a nested [`Parameter`] carrying the fields of the
//! referenced definition. Property order is the order the server declared,
//! which is also the order positional arguments bind in.

use dayloop_core::capability::{ParamKind, Parameter};
use serde_json::Value;

/// Resolve the top-level `properties` of `schema`.
pub fn resolve_parameters(schema: &Value) -> Vec<Parameter> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    properties
        .iter()
        .map(|(name, property)| match reference_of(property) {
            Some(reference) => {
                let fields = lookup_definition(schema, reference)
                    .map(|def| field_list(schema, def))
                    .unwrap_or_default();
                let short = short_name(reference);
                if fields.is_empty() {
                    Parameter {
                        reference: Some(short.to_string()),
                        ..Parameter::new(name, kind_of(property))
                    }
                } else {
                    Parameter::nested(name, short, fields)
                }
            }
            None => Parameter::new(name, kind_of(property)),
        })
        .collect()
}

/// Fields of a referenced definition. Nested references inside it are not
/// followed further; they surface as `object` fields.
fn field_list(root: &Value, definition: &Value) -> Vec<Parameter> {
    definition
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(name, property)| {
                    let kind = match reference_of(property) {
                        Some(reference) => lookup_definition(root, reference)
                            .map(kind_of)
                            .unwrap_or(ParamKind::Other(None)),
                        None => kind_of(property),
                    };
                    Parameter::new(name, kind)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// The `$ref` of a property, directly or through a single-element `allOf`.
fn reference_of(property: &Value) -> Option<&str> {
    if let Some(reference) = property.get("$ref").and_then(Value::as_str) {
        return Some(reference);
    }
    match property.get("allOf").and_then(Value::as_array).map(Vec::as_slice) {
        Some([only]) => only.get("$ref").and_then(Value::as_str),
        _ => None,
    }
}

/// Follow a local `#/$defs/X` or `#/definitions/X` pointer.
fn lookup_definition<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let name = reference
        .strip_prefix("#/$defs/")
        .map(|n| ("$defs", n))
        .or_else(|| reference.strip_prefix("#/definitions/").map(|n| ("definitions", n)))?;
    root.get(name.0)?.get(name.1)
}

fn short_name(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// The declared kind of a property schema.
///
/// `type` may be a list (`["string", "null"]`) and optional pydantic fields
/// arrive as `anyOf: [{"type": "string"}, {"type": "null"}]`; in both cases
/// the first non-null type wins.
fn kind_of(property: &Value) -> ParamKind {
    ParamKind::from_type_name(declared_type(property))
}

fn declared_type(property: &Value) -> Option<&str> {
    match property.get("type") {
        Some(Value::String(t)) => return Some(t.as_str()),
        Some(Value::Array(types)) => {
            return types.iter().filter_map(Value::as_str).find(|t| *t != "null");
        }
        _ => {}
    }
    property
        .get("anyOf")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(declared_type)
        .find(|t| *t != "null")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_properties_keep_declaration_order() {
        let schema = json!({
            "type": "object",
            "properties": {
                "date": {"type": "string"},
                "time": {"type": "string"},
                "content": {"type": "string"},
                "priority": {"type": "integer"}
            }
        });
        let params = resolve_parameters(&schema);
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["date", "time", "content", "priority"]);
        assert_eq!(params[3].kind, ParamKind::Integer);
    }

    #[test]
    fn defs_reference_becomes_nested_parameter() {
        let schema = json!({
            "properties": {"input": {"$ref": "#/$defs/CreateTodoInput"}},
            "required": ["input"],
            "$defs": {
                "CreateTodoInput": {
                    "properties": {
                        "date": {"type": "string", "title": "Date"},
                        "content": {"type": "string", "title": "Content"}
                    },
                    "type": "object"
                }
            }
        });
        let params = resolve_parameters(&schema);
        assert_eq!(params.len(), 1);
        let input = &params[0];
        assert_eq!(input.name, "input");
        assert_eq!(input.reference.as_deref(), Some("CreateTodoInput"));
        let fields: Vec<&str> = input.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["date", "content"]);
    }

    #[test]
    fn definitions_and_all_of_are_followed() {
        let schema = json!({
            "properties": {"input": {"allOf": [{"$ref": "#/definitions/DeleteTodoInput"}]}},
            "definitions": {
                "DeleteTodoInput": {"properties": {"id": {"type": "integer"}}}
            }
        });
        let params = resolve_parameters(&schema);
        assert!(params[0].is_nested());
        assert_eq!(params[0].fields[0].kind, ParamKind::Integer);
    }

    #[test]
    fn missing_type_is_unknown() {
        let schema = json!({"properties": {"anything": {"title": "Anything"}}});
        let params = resolve_parameters(&schema);
        assert_eq!(params[0].kind, ParamKind::Other(None));
        assert_eq!(params[0].kind.type_name(), "unknown");
    }

    #[test]
    fn optional_fields_take_first_non_null_type() {
        let schema = json!({
            "properties": {
                "note": {"anyOf": [{"type": "string"}, {"type": "null"}], "default": null},
                "ids": {"type": ["null", "array"]}
            }
        });
        let params = resolve_parameters(&schema);
        assert_eq!(params[0].kind, ParamKind::String);
        assert_eq!(params[1].kind, ParamKind::Array);
    }

    #[test]
    fn unresolvable_reference_stays_flat() {
        let schema = json!({"properties": {"input": {"$ref": "#/$defs/Missing"}}});
        let params = resolve_parameters(&schema);
        assert!(!params[0].is_nested());
        assert_eq!(params[0].reference.as_deref(), Some("Missing"));
        assert_eq!(params[0].kind, ParamKind::Other(None));
    }

    #[test]
    fn schema_without_properties_has_no_parameters() {
        assert!(resolve_parameters(&json!({"type": "object"})).is_empty());
        assert!(resolve_parameters(&Value::Null).is_empty());
    }
}
