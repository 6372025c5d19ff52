//! Event classification and message rendering
//!
//! Maps a decoded Authentik event to the title, formatted body, and
//! priority of the outgoing Gotify notification. Unrecognized actions are
//! never dropped; they degrade to a generic title at the default priority
//! so operators still see new upstream event types.

use crate::decode::DecodeError;
use crate::events::InboundEvent;
use std::collections::HashMap;

/// Priority for alerting-grade notifications (failed logins, parse errors).
pub const PRIORITY_ALERT: u8 = 7;

/// Priority for informational notifications and the fallback path.
pub const PRIORITY_NORMAL: u8 = 4;

/// Title used when a delivery cannot be decoded at all.
pub const PARSE_ERROR_TITLE: &str = "Error parsing JSON message";

/// A single policy table entry.
#[derive(Debug, Clone, Copy)]
pub struct PolicyEntry {
    pub title: &'static str,
    pub priority: u8,
}

/// Static mapping from recognized action identifiers to notification
/// title and priority. Built once at startup, never mutated.
#[derive(Debug, Clone)]
pub struct ClassificationPolicy {
    entries: HashMap<&'static str, PolicyEntry>,
    fallback_priority: u8,
}

impl ClassificationPolicy {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            "login_failed",
            PolicyEntry {
                title: "Authentik: Failed Login Attempt",
                priority: PRIORITY_ALERT,
            },
        );
        entries.insert(
            "login",
            PolicyEntry {
                title: "Authentik: Successful Login",
                priority: PRIORITY_NORMAL,
            },
        );

        Self {
            entries,
            fallback_priority: PRIORITY_NORMAL,
        }
    }

    /// Exact, case-sensitive lookup of an action identifier.
    pub fn lookup(&self, action: &str) -> Option<PolicyEntry> {
        self.entries.get(action).copied()
    }

    pub fn fallback_priority(&self) -> u8 {
        self.fallback_priority
    }

    /// Recognized action identifiers, sorted. Used to keep the setup
    /// guide consistent with the table.
    pub fn recognized_actions(&self) -> Vec<&'static str> {
        let mut actions: Vec<_> = self.entries.keys().copied().collect();
        actions.sort_unstable();
        actions
    }
}

impl Default for ClassificationPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// The rendered notification handed to the sink.
///
/// Constructed once per delivery, then discarded; no identity beyond the
/// single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDraft {
    pub title: String,
    pub body: String,
    pub priority: u8,
}

/// Classifies decoded events and renders notification drafts.
///
/// Holds only read-only dependencies (the policy table and the configured
/// friendly name); all per-request data arrives as arguments, so one
/// instance can serve any number of concurrent deliveries.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    policy: ClassificationPolicy,
    friendly_name: Option<String>,
}

impl EventClassifier {
    /// An empty friendly name behaves the same as an unset one.
    pub fn new(policy: ClassificationPolicy, friendly_name: Option<String>) -> Self {
        Self {
            policy,
            friendly_name: friendly_name.filter(|name| !name.is_empty()),
        }
    }

    /// Produce the notification draft for a decoded event.
    ///
    /// Never fails: actions absent from the policy table take the generic
    /// fallback framing instead.
    pub fn classify(&self, event: &InboundEvent, origin: &str) -> NotificationDraft {
        let (title, priority) = match self.policy.lookup(&event.action) {
            Some(entry) => (entry.title.to_string(), entry.priority),
            None => (fallback_title(&event.action), self.policy.fallback_priority()),
        };

        NotificationDraft {
            title,
            body: self.render_body(&event.to_pretty_json(), origin),
            priority,
        }
    }

    /// Render a decode failure as its own notification, carrying the
    /// error text where the payload would normally go.
    pub fn decode_failure(&self, err: &DecodeError, origin: &str) -> NotificationDraft {
        NotificationDraft {
            title: PARSE_ERROR_TITLE.to_string(),
            body: self.render_body(&err.to_string(), origin),
            priority: PRIORITY_ALERT,
        }
    }

    /// First line of every body: the configured friendly name if present,
    /// otherwise the network origin of the request.
    fn instance_line(&self, origin: &str) -> String {
        match &self.friendly_name {
            Some(name) => format!("Authentik instance: {}", name),
            None => format!("Authentik instance at: {}", origin),
        }
    }

    fn render_body(&self, raw: &str, origin: &str) -> String {
        format!("{}\n\n```\n{}\n```", self.instance_line(origin), raw)
    }
}

fn fallback_title(action: &str) -> String {
    if action.is_empty() {
        "Authentik Event".to_string()
    } else {
        format!("Authentik Event: {}", action)
    }
}
