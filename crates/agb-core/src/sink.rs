//! Notification sink trait
//!
//! The delivery side (Gotify) lives in its own crate; the web layer only
//! depends on this trait, which also makes it trivial to record drafts in
//! tests.

use crate::classify::NotificationDraft;
use async_trait::async_trait;
use thiserror::Error;

/// A draft could not be delivered.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivers rendered notifications to their destination.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, draft: &NotificationDraft) -> Result<(), SinkError>;
}
