//! Decision validation: the strict boundary between oracle text and the loop.
//!
//! The oracle is asked for one JSON object per turn:
//!
//! ```json
//! {"final_iteration": "False", "your_comment": "", "function_name": "get_current_date", "parameters": []}
//! ```
//!
//! Anything that does not parse into a [`Decision`] is a [`DecisionError`];
//! the loop never acts on a half-understood answer.

use dayloop_core::error::DecisionError;
use serde_json::{Map, Value};

const REQUIRED_FIELDS: [&str; 4] = ["final_iteration", "your_comment", "function_name", "parameters"];

/// Whether the oracle considers the task done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalFlag {
    True,
    False,
}

impl FinalFlag {
    /// Only the literal string `"True"` ends a run; any other value, JSON
    /// `true` included, keeps it going.
    fn from_value(value: &Value) -> Self {
        match value.as_str() {
            Some("True") => Self::True,
            _ => Self::False,
        }
    }
}

/// Arguments as the oracle sent them, before binding.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionArguments {
    Positional(Vec<Value>),
    Keyed(Map<String, Value>),
}

impl DecisionArguments {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Positional(values) => values.is_empty(),
            Self::Keyed(map) => map.is_empty(),
        }
    }
}

impl std::fmt::Display for DecisionArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = match self {
            Self::Positional(values) => Value::Array(values.clone()),
            Self::Keyed(map) => Value::Object(map.clone()),
        };
        write!(f, "{value}")
    }
}

/// One validated oracle answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub final_iteration: FinalFlag,
    /// User-facing answer when final, free commentary otherwise
    pub your_comment: String,
    pub function_name: String,
    pub parameters: DecisionArguments,
}

impl Decision {
    pub fn is_final(&self) -> bool {
        self.final_iteration == FinalFlag::True
    }
}

/// Parse and validate a raw oracle answer.
pub fn parse(raw: &str) -> Result<Decision, DecisionError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| DecisionError::Malformed {
        reason: format!("not valid JSON: {e}"),
    })?;

    let Value::Object(mut object) = value else {
        return Err(DecisionError::Malformed {
            reason: "expected a JSON object".into(),
        });
    };

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !object.contains_key(**field))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(DecisionError::Incomplete { missing });
    }

    let final_iteration = FinalFlag::from_value(&object["final_iteration"]);
    let your_comment = take_string(&mut object, "your_comment")?;

    // A final answer never invokes anything, so its call fields go unchecked.
    if final_iteration == FinalFlag::True {
        let function_name = match object.remove("function_name") {
            Some(Value::String(s)) => s,
            _ => String::new(),
        };
        let parameters = match object.remove("parameters") {
            Some(Value::Array(values)) => DecisionArguments::Positional(values),
            Some(Value::Object(map)) => DecisionArguments::Keyed(map),
            _ => DecisionArguments::Keyed(Map::new()),
        };
        return Ok(Decision {
            final_iteration,
            your_comment,
            function_name,
            parameters,
        });
    }

    let function_name = take_string(&mut object, "function_name")?;
    let parameters = match object.remove("parameters") {
        Some(Value::Array(values)) => DecisionArguments::Positional(values),
        Some(Value::Object(map)) => DecisionArguments::Keyed(map),
        other => {
            return Err(DecisionError::Malformed {
                reason: format!(
                    "parameters must be a list or an object, got {}",
                    other.unwrap_or(Value::Null)
                ),
            });
        }
    };

    Ok(Decision {
        final_iteration,
        your_comment,
        function_name,
        parameters,
    })
}

fn take_string(object: &mut Map<String, Value>, field: &str) -> Result<String, DecisionError> {
    match object.remove(field) {
        Some(Value::String(s)) => Ok(s),
        other => Err(DecisionError::Malformed {
            reason: format!(
                "{field} must be a string, got {}",
                other.unwrap_or(Value::Null)
            ),
        }),
    }
}
