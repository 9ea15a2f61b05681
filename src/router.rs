//! Inbound envelope classification.
//!
//! An envelope is the outer JSON structure of a platform notification,
//! distinct from the inner message payload. Routing only runs on envelopes
//! that already passed authentication and dedup admission.

use serde::Deserialize;

/// Envelope type for the URL-verification handshake.
pub const ENVELOPE_URL_VERIFICATION: &str = "url_verification";
/// Envelope type wrapping Events API callbacks.
pub const ENVELOPE_EVENT_CALLBACK: &str = "event_callback";
/// Inner event type carrying user messages.
const EVENT_MESSAGE: &str = "message";
/// Message subtype the platform stamps on bot-authored messages.
const SUBTYPE_BOT_MESSAGE: &str = "bot_message";

/// Outer notification envelope. Unknown envelope types deserialize fine and
/// fall through to a plain acknowledgment.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Platform-assigned logical event id; the dedup key.
    #[serde(default)]
    pub event_id: Option<String>,
    /// Handshake token, present on `url_verification` envelopes only.
    #[serde(default)]
    pub challenge: Option<String>,
    #[serde(default)]
    pub event: Option<MessageEvent>,
}

/// Inner event payload of an `event_callback` envelope. Every field is
/// optional — non-message events share the same slot with other shapes.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A user message handed to the response orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchedMessage {
    pub channel: String,
    pub text: String,
}

/// Why an envelope was acknowledged without further work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckReason {
    /// Bot-authored or self-authored message — replying would loop.
    SelfAuthored,
    /// Recognized but unhandled shape; a 200 keeps the platform from
    /// retrying indefinitely.
    Unhandled,
}

/// Where a verified, admitted envelope goes next.
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    /// Echo the handshake challenge back verbatim.
    Challenge(String),
    /// Hand the message to the response orchestrator.
    Dispatch(DispatchedMessage),
    /// Acknowledge with a plain 200 and do nothing else.
    Ack(AckReason),
}

/// Classify an envelope.
///
/// `bot_user_id` is the running bot's own identity; messages it authored
/// are acknowledged as a no-op to avoid feedback loops. An empty id
/// degrades self-filtering to the `bot_id`/`subtype` checks only.
pub fn route(envelope: &Envelope, bot_user_id: &str) -> Route {
    if envelope.kind == ENVELOPE_URL_VERIFICATION {
        if let Some(ref challenge) = envelope.challenge {
            return Route::Challenge(challenge.clone());
        }
        return Route::Ack(AckReason::Unhandled);
    }

    if envelope.kind != ENVELOPE_EVENT_CALLBACK {
        return Route::Ack(AckReason::Unhandled);
    }
    let Some(ref event) = envelope.event else {
        return Route::Ack(AckReason::Unhandled);
    };
    if event.kind != EVENT_MESSAGE {
        return Route::Ack(AckReason::Unhandled);
    }

    let self_authored = event.subtype.as_deref() == Some(SUBTYPE_BOT_MESSAGE)
        || event.bot_id.is_some()
        || (!bot_user_id.is_empty() && event.user.as_deref() == Some(bot_user_id));
    if self_authored {
        return Route::Ack(AckReason::SelfAuthored);
    }

    match (event.channel.as_deref(), event.text.as_deref()) {
        (Some(channel), Some(text)) if !channel.is_empty() && !text.is_empty() => {
            Route::Dispatch(DispatchedMessage {
                channel: channel.to_owned(),
                text: text.to_owned(),
            })
        }
        // No reply target or nothing to reply to — acknowledge and move on.
        _ => Route::Ack(AckReason::Unhandled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOT_USER_ID: &str = "U0BOT";

    fn parse(json: serde_json::Value) -> Envelope {
        serde_json::from_value(json).unwrap()
    }

    fn message_envelope(event: serde_json::Value) -> Envelope {
        parse(serde_json::json!({
            "type": "event_callback",
            "event_id": "Ev001",
            "event": event
        }))
    }

    #[test]
    fn url_verification_echoes_challenge_verbatim() {
        let envelope = parse(serde_json::json!({
            "type": "url_verification",
            "challenge": "abc123"
        }));
        assert_eq!(
            route(&envelope, BOT_USER_ID),
            Route::Challenge("abc123".into())
        );
    }

    #[test]
    fn url_verification_without_challenge_is_acked() {
        let envelope = parse(serde_json::json!({ "type": "url_verification" }));
        assert_eq!(route(&envelope, BOT_USER_ID), Route::Ack(AckReason::Unhandled));
    }

    #[test]
    fn user_message_dispatches() {
        let envelope = message_envelope(serde_json::json!({
            "type": "message",
            "channel": "C123",
            "user": "U456",
            "text": "hi"
        }));
        assert_eq!(
            route(&envelope, BOT_USER_ID),
            Route::Dispatch(DispatchedMessage {
                channel: "C123".into(),
                text: "hi".into(),
            })
        );
    }

    #[test]
    fn bot_message_subtype_is_self_acked() {
        let envelope = message_envelope(serde_json::json!({
            "type": "message",
            "channel": "C123",
            "user": "U456",
            "subtype": "bot_message",
            "text": "hi"
        }));
        assert_eq!(
            route(&envelope, BOT_USER_ID),
            Route::Ack(AckReason::SelfAuthored)
        );
    }

    #[test]
    fn bot_id_marker_is_self_acked() {
        let envelope = message_envelope(serde_json::json!({
            "type": "message",
            "channel": "C123",
            "bot_id": "B789",
            "text": "hi"
        }));
        assert_eq!(
            route(&envelope, BOT_USER_ID),
            Route::Ack(AckReason::SelfAuthored)
        );
    }

    #[test]
    fn own_user_id_is_self_acked() {
        let envelope = message_envelope(serde_json::json!({
            "type": "message",
            "channel": "C123",
            "user": BOT_USER_ID,
            "text": "hi"
        }));
        assert_eq!(
            route(&envelope, BOT_USER_ID),
            Route::Ack(AckReason::SelfAuthored)
        );
    }

    #[test]
    fn empty_bot_identity_never_matches_users() {
        let envelope = message_envelope(serde_json::json!({
            "type": "message",
            "channel": "C123",
            "user": "U456",
            "text": "hi"
        }));
        assert!(matches!(route(&envelope, ""), Route::Dispatch(_)));
    }

    #[test]
    fn non_message_event_is_acked() {
        let envelope = message_envelope(serde_json::json!({
            "type": "reaction_added",
            "user": "U456"
        }));
        assert_eq!(route(&envelope, BOT_USER_ID), Route::Ack(AckReason::Unhandled));
    }

    #[test]
    fn event_callback_without_event_is_acked() {
        let envelope = parse(serde_json::json!({
            "type": "event_callback",
            "event_id": "Ev001"
        }));
        assert_eq!(route(&envelope, BOT_USER_ID), Route::Ack(AckReason::Unhandled));
    }

    #[test]
    fn unknown_envelope_type_is_acked() {
        let envelope = parse(serde_json::json!({ "type": "app_rate_limited" }));
        assert_eq!(route(&envelope, BOT_USER_ID), Route::Ack(AckReason::Unhandled));
    }

    #[test]
    fn message_without_channel_is_acked() {
        let envelope = message_envelope(serde_json::json!({
            "type": "message",
            "user": "U456",
            "text": "hi"
        }));
        assert_eq!(route(&envelope, BOT_USER_ID), Route::Ack(AckReason::Unhandled));
    }

    #[test]
    fn message_with_empty_text_is_acked() {
        let envelope = message_envelope(serde_json::json!({
            "type": "message",
            "channel": "C123",
            "user": "U456",
            "text": ""
        }));
        assert_eq!(route(&envelope, BOT_USER_ID), Route::Ack(AckReason::Unhandled));
    }
}
