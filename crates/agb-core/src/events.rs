//! Inbound event model
//!
//! Authentik's webhook payload is only loosely structured: the `action`
//! field discriminates the event type, everything else (user, client IP,
//! app name, severity, nested context) varies between event types and
//! Authentik versions. Only `action` is parsed; the rest is carried as an
//! opaque map so new upstream fields pass through untouched.

use serde::{Deserialize, Serialize};

/// One decoded Authentik webhook delivery.
///
/// Immutable once decoded; the classifier never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Identifier naming the triggering event type (e.g. "login",
    /// "login_failed"). Missing in the payload decodes to empty; an
    /// empty action is skipped on re-serialization so the rendered
    /// payload shows no field the sender never sent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,

    /// All remaining payload fields, preserved verbatim.
    #[serde(flatten)]
    pub context: serde_json::Map<String, serde_json::Value>,
}

impl InboundEvent {
    /// Pretty-printed JSON of the decoded payload, for verbatim inclusion
    /// in notification bodies.
    pub fn to_pretty_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "<unrenderable payload>".to_string())
    }
}
