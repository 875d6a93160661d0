//! Capability registry: what the remote session can do, resolved once.

use dayloop_core::capability::{Capability, CapabilitySession};
use dayloop_core::error::CapabilityError;
use tracing::{info, warn};

use crate::schema::resolve_parameters;

/// Ordered set of capabilities discovered for one run.
///
/// Order is the server's listing order, which is also the order the
/// capabilities are described to the oracle.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: Vec<Capability>,
}

impl CapabilityRegistry {
    /// Enumerate the session's tools and resolve their schemas.
    pub async fn discover(
        session: &mut dyn CapabilitySession,
    ) -> Result<Self, CapabilityError> {
        let tools = session.list_tools().await?;

        let mut registry = Self::default();
        for tool in tools {
            if registry.get(&tool.name).is_some() {
                warn!(capability = %tool.name, "Duplicate capability in listing, keeping the first");
                continue;
            }
            registry.capabilities.push(Capability {
                parameters: resolve_parameters(&tool.input_schema),
                name: tool.name,
                description: tool.description,
            });
        }

        info!(count = registry.len(), names = ?registry.names(), "Capabilities discovered");
        Ok(registry)
    }

    /// Build a registry from already resolved capabilities.
    pub fn from_capabilities(capabilities: Vec<Capability>) -> Self {
        Self { capabilities }
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.capabilities.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    /// Numbered, one-line-per-capability description for the system prompt.
    pub fn describe(&self) -> String {
        self.capabilities
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{}. {} - {}", i + 1, c.signature(), c.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a CapabilityRegistry {
    type Item = &'a Capability;
    type IntoIter = std::slice::Iter<'a, Capability>;

    fn into_iter(self) -> Self::IntoIter {
        self.capabilities.iter()
    }
}
