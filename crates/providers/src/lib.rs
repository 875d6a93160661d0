//! Oracle provider implementations for Dayloop.
//!
//! All providers implement the `dayloop_core::Provider` trait.
//! The router selects the correct provider based on configuration, and the
//! gateway wraps it with the per-call timeout the agent loop relies on.

pub mod gateway;
pub mod openai_compat;
pub mod router;

pub use gateway::{OracleGateway, strip_code_fence};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config, model_for};
