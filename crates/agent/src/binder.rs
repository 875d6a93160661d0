//! Argument binding: fit the oracle's raw arguments onto a capability schema.
//!
//! Binding walks the schema's parameters in declaration order and produces
//! one typed value per parameter, or fails as a whole. Keyed arguments are
//! looked up by name; positional arguments are consumed front to back.
//! Raw values left over once every parameter is bound are ignored.

use std::collections::VecDeque;

use dayloop_core::capability::{BoundArguments, BoundValue, Capability, ParamKind, Parameter};
use dayloop_core::error::BindError;
use serde_json::{Map, Value};

use crate::decision::DecisionArguments;

/// Bind `arguments` to `capability`'s parameters.
pub fn bind(capability: &Capability, arguments: &DecisionArguments) -> Result<BoundArguments, BindError> {
    let mut source = ArgumentSource::new(arguments);

    let Some(input) = capability.nested_input() else {
        return bind_fields(&capability.name, &capability.parameters, &mut source);
    };

    // A single object, either positional or wrapped under the parameter's
    // name, holds the nested fields by name.
    source.unwrap_object(&input.name);

    let fields = bind_fields(&capability.name, &input.fields, &mut source)?;
    let mut bound = BoundArguments::new();
    bound.push(input.name.clone(), BoundValue::Structured(fields));
    Ok(bound)
}

/// Raw arguments in the shape binding consumes them.
enum ArgumentSource {
    Positional(VecDeque<Value>),
    Keyed(Map<String, Value>),
}

impl ArgumentSource {
    fn new(arguments: &DecisionArguments) -> Self {
        match arguments {
            DecisionArguments::Positional(values) => Self::Positional(values.iter().cloned().collect()),
            DecisionArguments::Keyed(map) => Self::Keyed(map.clone()),
        }
    }

    /// Switch to keyed lookup when the arguments are one object standing in
    /// for a nested structure.
    fn unwrap_object(&mut self, wrapper: &str) {
        let inner = match self {
            Self::Positional(values) if values.len() == 1 => match values.front() {
                Some(Value::Object(map)) => Some(map.clone()),
                _ => None,
            },
            Self::Keyed(map) if map.len() == 1 => match map.get(wrapper) {
                Some(Value::Object(inner)) => Some(inner.clone()),
                _ => None,
            },
            _ => None,
        };
        if let Some(map) = inner {
            *self = Self::Keyed(map);
        }
    }

    fn next_for(&mut self, parameter: &str) -> Option<Value> {
        match self {
            Self::Positional(values) => values.pop_front(),
            Self::Keyed(map) => map.get(parameter).cloned(),
        }
    }
}

fn bind_fields(
    capability: &str,
    parameters: &[Parameter],
    source: &mut ArgumentSource,
) -> Result<BoundArguments, BindError> {
    let mut bound = BoundArguments::new();
    for parameter in parameters {
        let raw = source
            .next_for(&parameter.name)
            .ok_or_else(|| BindError::ArgumentCount {
                capability: capability.to_string(),
                parameter: parameter.name.clone(),
            })?;
        bound.push(parameter.name.clone(), coerce(parameter, &raw)?);
    }
    Ok(bound)
}

/// Convert one raw value to the parameter's declared kind.
pub fn coerce(parameter: &Parameter, raw: &Value) -> Result<BoundValue, BindError> {
    let mismatch = || BindError::TypeCoercion {
        parameter: parameter.name.clone(),
        expected: parameter.kind.type_name().to_string(),
        value: raw.to_string(),
    };

    match &parameter.kind {
        ParamKind::Integer => coerce_integer(raw).map(BoundValue::Integer).ok_or_else(mismatch),
        ParamKind::Number => coerce_number(raw).map(BoundValue::Float).ok_or_else(mismatch),
        ParamKind::Array => coerce_integer_list(raw).map(BoundValue::IntegerList).ok_or_else(mismatch),
        ParamKind::String | ParamKind::Other(_) => Ok(BoundValue::Text(match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
    }
}

fn coerce_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64().or_else(|| {
            let f = n.as_f64()?;
            (f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
                .then_some(f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_number(raw: &Value) -> Option<f64> {
    let f = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

/// `"[1, 2, 3]"`, `"1,2"` and `[1, "2"]` all bind to `[1, 2, 3]`-style lists.
fn coerce_integer_list(raw: &Value) -> Option<Vec<i64>> {
    match raw {
        Value::String(s) => {
            let body = s.trim();
            let body = body.strip_prefix('[').unwrap_or(body);
            let body = body.strip_suffix(']').unwrap_or(body).trim();
            if body.is_empty() {
                return Some(Vec::new());
            }
            body.split(',').map(|piece| piece.trim().parse().ok()).collect()
        }
        Value::Array(items) => items.iter().map(coerce_integer).collect(),
        _ => None,
    }
}
