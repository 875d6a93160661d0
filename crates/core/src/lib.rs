//! # Dayloop Core
//!
//! Domain types, traits, and error definitions for the Dayloop planning
//! agent. This crate has **no framework dependencies**: it defines the
//! domain model that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is a trait here. Implementations
//! live in their respective crates:
//! - [`Provider`]: the oracle (`dayloop-providers`)
//! - [`CapabilitySession`] / [`SessionConnector`]: the remote tool server (`dayloop-mcp`)
//! - [`Notifier`]: final answer delivery (`dayloop-channels`)

pub mod error;
pub mod message;
pub mod provider;
pub mod capability;
pub mod memory;
pub mod channel;
pub mod agent;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use message::{Message, Role, RunId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use capability::{
    BoundArguments, BoundValue, Capability, CapabilitySession, ParamKind, Parameter, RemoteResult,
    SessionConnector, ToolDescriptor,
};
pub use memory::MemoryItem;
pub use channel::Notifier;
pub use agent::{AbortReason, ActionOutput, IterationRecord, RunOutcome, SessionState};
pub use event::{DomainEvent, EventBus};
