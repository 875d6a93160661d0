//! Notifier trait: where a finished run's answer is delivered.
//!
//! The agent loop itself never delivers anything; the caller hands the final
//! answer to a notifier and decides what to do when delivery fails.

use async_trait::async_trait;
use crate::error::ChannelError;

/// A sink for final answers (HTTP endpoint, chat platform, terminal...).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A short name for logs (e.g., "webhook").
    fn name(&self) -> &str;

    /// Deliver one final answer.
    async fn deliver(&self, answer: &str) -> std::result::Result<(), ChannelError>;
}
