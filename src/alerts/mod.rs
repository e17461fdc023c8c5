//! Operator-facing notifications.

mod feed;
mod rules;

pub use feed::AlertFeed;
pub use rules::AlertRules;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Alert {
    pub id: Uuid,
    pub level: AlertLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Receiver for notifications. Rendering is the receiver's business.
pub trait AlertSink: Send + Sync {
    fn notify(&self, level: AlertLevel, message: &str, timestamp: DateTime<Utc>);
}

impl<T: AlertSink + ?Sized> AlertSink for Arc<T> {
    fn notify(&self, level: AlertLevel, message: &str, timestamp: DateTime<Utc>) {
        (**self).notify(level, message, timestamp);
    }
}
