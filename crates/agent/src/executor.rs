//! Action execution: invoke a resolved capability and normalise the result.

use dayloop_core::agent::ActionOutput;
use dayloop_core::capability::{BoundArguments, Capability, CapabilitySession};
use dayloop_core::error::CapabilityError;
use dayloop_mcp::CapabilityRegistry;
use serde_json::Value;
use tracing::{debug, warn};

/// Executes capability calls against one open session.
pub struct ActionExecutor<'a> {
    registry: &'a CapabilityRegistry,
    session: &'a mut dyn CapabilitySession,
}

impl<'a> ActionExecutor<'a> {
    pub fn new(registry: &'a CapabilityRegistry, session: &'a mut dyn CapabilitySession) -> Self {
        Self { registry, session }
    }

    /// Look up a discovered capability by name.
    pub fn resolve(&self, name: &str) -> Result<&'a Capability, CapabilityError> {
        self.registry
            .get(name)
            .ok_or_else(|| CapabilityError::UnknownCapability(name.to_string()))
    }

    /// Invoke `name` with already bound arguments. No retries.
    pub async fn execute(
        &mut self,
        name: &str,
        arguments: &BoundArguments,
    ) -> Result<ActionOutput, CapabilityError> {
        self.resolve(name)?;
        let result = self.session.call_tool(name, arguments).await?;

        if result.0.get("isError").and_then(Value::as_bool) == Some(true) {
            warn!(capability = name, "Capability reported an error result");
        }

        let output = normalize(&result.0);
        debug!(capability = name, output = %output, "Capability returned");
        Ok(output)
    }
}

/// Flatten a `tools/call` result into text.
///
/// A single content part collapses to [`ActionOutput::Text`]; callers that
/// need the list shape must not rely on it for one-element results.
pub fn normalize(result: &Value) -> ActionOutput {
    match result.get("content") {
        Some(Value::Array(parts)) => {
            let mut texts: Vec<String> = parts
                .iter()
                .map(|part| match part.get("text").and_then(Value::as_str) {
                    Some(text) => text.to_string(),
                    None => part.to_string(),
                })
                .collect();
            if texts.len() == 1 {
                ActionOutput::Text(texts.remove(0))
            } else {
                ActionOutput::Parts(texts)
            }
        }
        Some(Value::String(s)) => ActionOutput::Text(s.clone()),
        Some(other) => ActionOutput::Text(other.to_string()),
        None => ActionOutput::Text(result.to_string()),
    }
}
