//! Core of the Authentik → Gotify bridge
//!
//! This crate holds everything with actual decision logic:
//!
//! - **events**: the decoded webhook payload model
//! - **decode**: raw bytes → [`InboundEvent`]
//! - **classify**: policy table, classifier, and message renderer
//! - **sink**: the trait the delivery side implements
//! - **config**: TOML configuration with env overrides
//!
//! The classifier is a pure function of its inputs plus the read-only
//! policy table, so everything here is safe under unbounded concurrent
//! use without locking.

pub mod classify;
pub mod config;
pub mod decode;
pub mod events;
pub mod sink;

pub use classify::{ClassificationPolicy, EventClassifier, NotificationDraft};
pub use decode::{decode, DecodeError};
pub use events::InboundEvent;
pub use sink::{NotificationSink, SinkError};
