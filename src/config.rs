//! Process configuration.
//!
//! Everything comes from environment variables and is validated once at
//! startup; nothing re-reads the environment afterwards. The loaded config
//! is handed to the gateway, which constructs and injects the shared state
//! explicitly — no module-level globals.

use anyhow::{Context, Result};
use std::env;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
/// Output-length budget passed to the completion service.
const DEFAULT_MAX_TOKENS: u32 = 150;
/// Dedup retention window. Must exceed the platform's maximum redelivery
/// interval (documented as roughly one hour).
const DEFAULT_EVENT_TTL_SECS: u64 = 3600;
/// Per-request timeout for collaborator calls.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Shared secret for inbound request signature verification.
    pub slack_signing_secret: String,
    /// Bearer token for the Slack Web API.
    pub slack_bot_token: String,
    /// The bot's own user id, for self-reply suppression. Resolved via
    /// `auth.test` at startup when unset.
    pub slack_bot_user_id: Option<String>,
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub openai_model: String,
    pub completion_max_tokens: u32,
    pub event_ttl_secs: u64,
    pub http_timeout_secs: u64,
}

impl Config {
    /// Load and validate configuration from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.into()),
            port: parsed_var("PORT", DEFAULT_PORT),
            slack_signing_secret: required_var("SLACK_SIGNING_SECRET")?,
            slack_bot_token: required_var("SLACK_BOT_TOKEN")?,
            slack_bot_user_id: optional_var("SLACK_BOT_USER_ID"),
            openai_api_key: required_var("OPENAI_API_KEY")?,
            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_OPENAI_API_BASE.into()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.into()),
            completion_max_tokens: parsed_var("COMPLETION_MAX_TOKENS", DEFAULT_MAX_TOKENS),
            event_ttl_secs: parsed_var("EVENT_TTL_SECS", DEFAULT_EVENT_TTL_SECS).max(1),
            http_timeout_secs: parsed_var("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS).max(1),
        })
    }
}

/// A required, non-empty environment variable.
fn required_var(name: &str) -> Result<String> {
    let value = env::var(name).with_context(|| format!("{name} must be set"))?;
    let value = value.trim().to_owned();
    anyhow::ensure!(!value.is_empty(), "{name} must not be empty");
    Ok(value)
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parsed_var<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names — the process environment is
    // shared across the parallel test harness.

    #[test]
    fn required_var_rejects_missing_and_blank() {
        assert!(required_var("RELAYBOT_TEST_UNSET_VAR").is_err());
        env::set_var("RELAYBOT_TEST_BLANK_VAR", "   ");
        assert!(required_var("RELAYBOT_TEST_BLANK_VAR").is_err());
    }

    #[test]
    fn required_var_trims_whitespace() {
        env::set_var("RELAYBOT_TEST_PADDED_VAR", "  secret  ");
        assert_eq!(required_var("RELAYBOT_TEST_PADDED_VAR").unwrap(), "secret");
    }

    #[test]
    fn optional_var_treats_blank_as_absent() {
        env::set_var("RELAYBOT_TEST_OPT_BLANK", "");
        assert_eq!(optional_var("RELAYBOT_TEST_OPT_BLANK"), None);
        env::set_var("RELAYBOT_TEST_OPT_SET", "U0BOT");
        assert_eq!(optional_var("RELAYBOT_TEST_OPT_SET"), Some("U0BOT".into()));
    }

    #[test]
    fn parsed_var_falls_back_on_garbage() {
        env::set_var("RELAYBOT_TEST_PARSE_BAD", "not-a-number");
        assert_eq!(parsed_var("RELAYBOT_TEST_PARSE_BAD", 42_u64), 42);
        env::set_var("RELAYBOT_TEST_PARSE_OK", "7");
        assert_eq!(parsed_var("RELAYBOT_TEST_PARSE_OK", 42_u64), 7);
    }
}
