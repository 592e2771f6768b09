// Core CRM entities. Entities reference each other by id only; resolution
// goes through the tenant-scoped store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub org_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            org_id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub member_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn new(org_id: Uuid, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            member_id: Uuid::new_v4(),
            org_id,
            name: name.into(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub lead_id: Uuid,
    pub org_id: Uuid,
    /// Member that owns this lead; automation notifications go to them.
    pub owner_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub contact_id: Uuid,
    pub org_id: Uuid,
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub deal_id: Uuid,
    pub org_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub stage: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    pub fn new(org_id: Uuid, owner_id: Uuid, name: impl Into<String>, stage: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            deal_id: Uuid::new_v4(),
            org_id,
            owner_id,
            name: name.into(),
            stage: stage.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Audit trail entry for automation side effects (stage changes, tasks).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub activity_id: Uuid,
    pub org_id: Uuid,
    pub member_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub kind: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(org_id: Uuid, kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            activity_id: Uuid::new_v4(),
            org_id,
            member_id: None,
            contact_id: None,
            kind: kind.into(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    pub fn for_member(mut self, member_id: Uuid) -> Self {
        self.member_id = Some(member_id);
        self
    }

    pub fn for_contact(mut self, contact_id: Uuid) -> Self {
        self.contact_id = Some(contact_id);
        self
    }
}

pub mod ticket_status {
    pub const OPEN: &str = "open";
    pub const RESOLVED: &str = "resolved";
    pub const CLOSED: &str = "closed";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: Uuid,
    pub org_id: Uuid,
    pub subject: String,
    pub status: String,
    pub priority: String,
    pub category_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub first_response_due: Option<DateTime<Utc>>,
    pub first_response_at: Option<DateTime<Utc>>,
    pub resolution_due: Option<DateTime<Utc>>,
    /// Monotonic: once true, never reset, even if a response arrives later.
    pub first_response_breached: bool,
    /// Monotonic, same contract as `first_response_breached`.
    pub resolution_breached: bool,
}

impl Ticket {
    pub fn new(org_id: Uuid, subject: impl Into<String>, priority: impl Into<String>) -> Self {
        Self {
            ticket_id: Uuid::new_v4(),
            org_id,
            subject: subject.into(),
            status: ticket_status::OPEN.to_string(),
            priority: priority.into(),
            category_id: None,
            assignee_id: None,
            created_at: Utc::now(),
            first_response_due: None,
            first_response_at: None,
            resolution_due: None,
            first_response_breached: false,
            resolution_breached: false,
        }
    }

    pub fn is_closed_out(&self) -> bool {
        self.status.eq_ignore_ascii_case(ticket_status::RESOLVED)
            || self.status.eq_ignore_ascii_case(ticket_status::CLOSED)
    }
}

/// Which of a ticket's two independent SLA timers breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreachKind {
    FirstResponse,
    Resolution,
}

impl BreachKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstResponse => "first response",
            Self::Resolution => "resolution",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCategory {
    pub category_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub default_assignee_id: Option<Uuid>,
    /// Fallback resolution SLA when no policy matches this category.
    pub default_sla_minutes: Option<i64>,
}

impl TicketCategory {
    pub fn new(org_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            category_id: Uuid::new_v4(),
            org_id,
            name: name.into(),
            default_assignee_id: None,
            default_sla_minutes: None,
        }
    }
}

/// Persisted in-app notification, written by the store-backed notifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: Uuid,
    pub org_id: Uuid,
    pub member_id: Uuid,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
