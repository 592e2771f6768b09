//! Outbound notification seam.
//!
//! Delivery is fire-and-forget with at-least-once semantics assumed by the
//! callers: a failed send is logged and never fails the operation that
//! triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::models::Notification;
use crate::store::Store;

pub mod kinds {
    pub const LEAD_CONVERTED: &str = "LEAD_CONVERTED";
    pub const LEAD_NURTURING: &str = "LEAD_NURTURING";
    pub const DEAL_STAGE_CHANGED: &str = "DEAL_STAGE_CHANGED";
    pub const DEAL_FOLLOW_UP: &str = "DEAL_FOLLOW_UP";
    pub const TICKET_ASSIGNED: &str = "TICKET_ASSIGNED";
    pub const SLA_BREACH: &str = "SLA_BREACH";
    pub const TICKET_ESCALATED: &str = "TICKET_ESCALATED";
    pub const FOLLOW_UP_REMINDER: &str = "FOLLOW_UP_REMINDER";
    pub const FOLLOW_UP_EMAIL: &str = "FOLLOW_UP_EMAIL";
    pub const CAMPAIGN_EMAIL: &str = "CAMPAIGN_EMAIL";
    pub const CAMPAIGN_SMS: &str = "CAMPAIGN_SMS";
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, org_id: Uuid, member_id: Uuid, kind: &str, title: &str, message: &str);
}

/// Notifier that only writes to the log. Used when no delivery channel is
/// configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, org_id: Uuid, member_id: Uuid, kind: &str, title: &str, message: &str) {
        info!(%org_id, %member_id, kind, title, message, "notification");
    }
}

/// Notifier that persists in-app notifications through the store.
pub struct StoreNotifier {
    store: Arc<dyn Store>,
}

impl StoreNotifier {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Notifier for StoreNotifier {
    async fn send(&self, org_id: Uuid, member_id: Uuid, kind: &str, title: &str, message: &str) {
        let notification = Notification {
            notification_id: Uuid::new_v4(),
            org_id,
            member_id,
            kind: kind.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            read: false,
            created_at: Utc::now(),
        };
        if let Err(e) = self.store.add_notification(notification).await {
            error!(%org_id, %member_id, kind, "failed to persist notification: {}", e);
        }
    }
}
