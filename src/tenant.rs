//! Explicit tenant context.
//!
//! Every engine call takes a `TenantScope` parameter instead of reading
//! ambient thread-local state, so background tasks can never leak one
//! tenant's identity into another's work.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Manager,
    Agent,
    /// Scheduler-driven scans that act on behalf of no particular member.
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantScope {
    pub org_id: Uuid,
    pub member_id: Option<Uuid>,
    pub role: Role,
}

impl TenantScope {
    pub fn new(org_id: Uuid, member_id: Uuid, role: Role) -> Self {
        Self {
            org_id,
            member_id: Some(member_id),
            role,
        }
    }

    /// Scope for background jobs iterating a tenant.
    pub fn system(org_id: Uuid) -> Self {
        Self {
            org_id,
            member_id: None,
            role: Role::System,
        }
    }
}
