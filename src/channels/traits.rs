//! Collaborator seam for outbound messaging.

use async_trait::async_trait;

/// Outbound messaging surface of the chat platform.
///
/// The orchestrator only ever posts text into a channel; the concrete
/// client owns credentials and API plumbing. Implementations must be safe
/// to share across request-handling tasks.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Platform name, for logs.
    fn name(&self) -> &str;

    /// Post a text message into `channel`.
    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()>;
}
