// Rule and policy definitions driving the automation engines. Operator,
// strategy and action fields are kept as strings on purpose: unknown values
// must degrade to a silent no-match/no-op instead of failing the run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod operators {
    pub const EQUALS: &str = "EQUALS";
    pub const NOT_EQUALS: &str = "NOT_EQUALS";
    pub const CONTAINS: &str = "CONTAINS";
    pub const NOT_CONTAINS: &str = "NOT_CONTAINS";
    pub const STARTS_WITH: &str = "STARTS_WITH";
    pub const ENDS_WITH: &str = "ENDS_WITH";
    pub const GREATER_THAN: &str = "GREATER_THAN";
    pub const LESS_THAN: &str = "LESS_THAN";
    pub const IN: &str = "IN";
}

pub mod strategies {
    pub const ROUND_ROBIN: &str = "ROUND_ROBIN";
    pub const LOAD_BALANCED: &str = "LOAD_BALANCED";
    pub const SKILL_BASED: &str = "SKILL_BASED";
    pub const SPECIFIC_AGENT: &str = "SPECIFIC_AGENT";
}

/// A single field/operator/value predicate. `logical_operator` is the
/// combinator that joins the *next* rule's result into the accumulator
/// (operator-after indexing; the last rule's operator is unused).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRule {
    pub rule_id: Uuid,
    pub org_id: Uuid,
    pub field_name: String,
    pub operator: String,
    pub field_value: String,
    pub logical_operator: String,
}

impl SegmentRule {
    pub fn new(
        org_id: Uuid,
        field_name: impl Into<String>,
        operator: impl Into<String>,
        field_value: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: Uuid::new_v4(),
            org_id,
            field_name: field_name.into(),
            operator: operator.into(),
            field_value: field_value.into(),
            logical_operator: "AND".to_string(),
        }
    }

    pub fn joined_by(mut self, logical_operator: impl Into<String>) -> Self {
        self.logical_operator = logical_operator.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealStageRule {
    pub rule_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub source_stage: String,
    pub target_stage: String,
    pub trigger_type: String,
    /// Higher priority rules win; ties broken by rule id for determinism.
    pub priority: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoAssignmentRule {
    pub rule_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// Optional filter; `None` matches any category.
    pub category_id: Option<Uuid>,
    /// Optional filter; `None` matches any priority.
    pub priority: Option<String>,
    pub strategy: String,
    pub specific_assignee_id: Option<Uuid>,
    pub rule_priority: i32,
    /// Load-balanced assignment skips members at or above this cap.
    pub max_tickets_per_agent: Option<i64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub policy_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub category_id: Option<Uuid>,
    pub priority: Option<String>,
    pub first_response_minutes: i64,
    pub resolution_minutes: i64,
    pub is_active: bool,
    /// Carried from the policy definition; due times are computed on the
    /// wall clock regardless.
    pub business_hours_only: bool,
    pub escalation_enabled: bool,
    pub escalation_assignee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpRule {
    pub rule_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// LEAD, DEAL or CONTACT.
    pub entity_type: String,
    pub inactivity_days: i64,
    /// CREATE_TASK, SEND_NOTIFICATION or SEND_EMAIL.
    pub action_type: String,
    pub task_title: Option<String>,
    pub task_description: Option<String>,
    pub notification_message: Option<String>,
    pub is_active: bool,
}
