//! Response orchestration: acknowledge, generate, relay.
//!
//! For each dispatched message the orchestrator posts an immediate
//! acknowledgment to the origin channel, invokes the completion service
//! with the message text, and relays the trimmed result back. Any step's
//! failure aborts the sequence; the gateway then asks for a best-effort
//! fallback notice before surfacing the error.

use std::sync::Arc;

use crate::channels::Messenger;
use crate::error::OrchestrationError;
use crate::providers::CompletionProvider;
use crate::router::DispatchedMessage;

/// Acknowledgment posted before the completion call.
pub const ACK_TEXT: &str = "Got it — thinking...";

/// Fallback notice posted when orchestration fails mid-flight.
pub const FALLBACK_TEXT: &str = "Sorry, something went wrong while generating a reply.";

pub struct Orchestrator {
    messenger: Arc<dyn Messenger>,
    provider: Arc<dyn CompletionProvider>,
    /// Output-length budget handed to the completion service.
    max_tokens: u32,
}

impl Orchestrator {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        provider: Arc<dyn CompletionProvider>,
        max_tokens: u32,
    ) -> Self {
        Self {
            messenger,
            provider,
            max_tokens,
        }
    }

    /// Run the acknowledge → generate → relay sequence for one message.
    pub async fn respond(&self, message: &DispatchedMessage) -> Result<(), OrchestrationError> {
        self.messenger
            .post_message(&message.channel, ACK_TEXT)
            .await
            .map_err(OrchestrationError::messaging)?;

        let completion = self
            .provider
            .complete(&message.text, self.max_tokens)
            .await
            .map_err(OrchestrationError::completion)?;

        self.messenger
            .post_message(&message.channel, completion.trim())
            .await
            .map_err(OrchestrationError::messaging)?;

        Ok(())
    }

    /// Post a best-effort failure notice to the origin channel.
    ///
    /// Fire-and-forget: its own failure is logged and discarded so it can
    /// never mask the original error. `channel` is optional — failures
    /// upstream of routing have no known reply target, and this path must
    /// never dereference one.
    pub async fn report_failure(&self, channel: Option<&str>, error: &OrchestrationError) {
        let Some(channel) = channel else {
            tracing::warn!("orchestration failed with no reply channel known: {error}");
            return;
        };
        if let Err(e) = self.messenger.post_message(channel, FALLBACK_TEXT).await {
            tracing::warn!("failed to post fallback notice to {channel}: {e:#}");
        }
    }
}
