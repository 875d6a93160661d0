//! Error types for the Dayloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each stage of the perception-decision-action cycle has its own error enum;
//! the agent loop only ever sees the top-level [`Error`].

use thiserror::Error;

/// The top-level error type for all Dayloop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Oracle errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Decision validation ---
    #[error("Decision error: {0}")]
    Decision(#[from] DecisionError),

    // --- Argument binding ---
    #[error("Binding error: {0}")]
    Binding(#[from] BindError),

    // --- Remote capability session ---
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Notification errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Stage errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Oracle did not respond within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),
}

/// The oracle answered, but not with a usable decision.
#[derive(Debug, Clone, Error)]
pub enum DecisionError {
    #[error("Malformed decision: {reason}")]
    Malformed { reason: String },

    #[error("Incomplete decision, missing fields: {}", missing.join(", "))]
    Incomplete { missing: Vec<String> },
}

/// The decision's arguments could not be fitted onto the capability schema.
#[derive(Debug, Clone, Error)]
pub enum BindError {
    #[error("Not enough arguments for {capability}: no value for '{parameter}'")]
    ArgumentCount {
        capability: String,
        parameter: String,
    },

    #[error("Cannot convert {value} to {expected} for parameter '{parameter}'")]
    TypeCoercion {
        parameter: String,
        expected: String,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Capability discovery failed: {0}")]
    Discovery(String),

    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Remote execution of {capability} failed: {reason}")]
    RemoteExecution { capability: String, reason: String },

    #[error("Session could not be opened: {0}")]
    Connect(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupted memory file {path}: {reason}")]
    Corrupted { path: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    #[error("Message delivery failed to {channel}: {reason}")]
    DeliveryFailed { channel: String, reason: String },
}
