//! Slack Web API client.
//!
//! Outgoing only: incoming events arrive via the gateway's `/slack/events`
//! endpoint; replies go out through `chat.postMessage` with bearer-token
//! authentication.

use std::time::Duration;

use async_trait::async_trait;

use super::traits::Messenger;

/// Slack Web API base URL.
const SLACK_API_BASE: &str = "https://slack.com/api";

/// Bot identity as reported by `auth.test`.
#[derive(Debug, Clone)]
pub struct BotIdentity {
    /// The bot's own user id — used to suppress self-replies.
    pub user_id: String,
    /// Display name of the bot user.
    pub name: String,
}

pub struct SlackClient {
    bot_token: String,
    api_base: String,
    client: reqwest::Client,
}

impl SlackClient {
    pub fn new(bot_token: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_api_base(bot_token, SLACK_API_BASE, timeout)
    }

    /// Point the client at a different API root (tests).
    pub fn with_api_base(
        bot_token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            bot_token: bot_token.into(),
            api_base: api_base.into().trim_end_matches('/').to_owned(),
            client,
        })
    }

    /// Check a Web API response: HTTP status plus the JSON `ok` field —
    /// Slack returns 200 for most app-level errors.
    fn check_api_response(
        method: &str,
        status: reqwest::StatusCode,
        body: &str,
    ) -> anyhow::Result<serde_json::Value> {
        if !status.is_success() {
            anyhow::bail!("Slack {method} failed ({status}): {body}");
        }
        let parsed: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| anyhow::anyhow!("Slack {method}: response is not valid JSON: {e}"))?;
        if parsed.get("ok") != Some(&serde_json::Value::Bool(true)) {
            let err = parsed
                .get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("unknown");
            anyhow::bail!("Slack {method} failed: {err}");
        }
        Ok(parsed)
    }

    /// Read-only identity query (`auth.test`).
    ///
    /// Resolves the bot's own user id so self-authored messages can be
    /// suppressed; also feeds the dashboard's identity display.
    pub async fn bot_identity(&self) -> anyhow::Result<BotIdentity> {
        let resp = self
            .client
            .post(format!("{}/auth.test", self.api_base))
            .bearer_auth(&self.bot_token)
            .send()
            .await?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
        let parsed = Self::check_api_response("auth.test", status, &body)?;

        let user_id = parsed
            .get("user_id")
            .and_then(|u| u.as_str())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Slack auth.test returned no user_id"))?
            .to_owned();
        let name = parsed
            .get("user")
            .and_then(|u| u.as_str())
            .unwrap_or_default()
            .to_owned();

        Ok(BotIdentity { user_id, name })
    }
}

#[async_trait]
impl Messenger for SlackClient {
    fn name(&self) -> &str {
        "slack"
    }

    async fn post_message(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "channel": channel,
            "text": text
        });

        let resp = self
            .client
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(&self.bot_token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
        Self::check_api_response("chat.postMessage", status, &body)?;

        Ok(())
    }
}
