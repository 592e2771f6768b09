// Drip campaign definitions and the per-contact execution ledger that makes
// step delivery idempotent across scheduler re-runs and restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod step_actions {
    pub const SEND_EMAIL: &str = "SEND_EMAIL";
    pub const SEND_SMS: &str = "SEND_SMS";
    pub const CREATE_TASK: &str = "CREATE_TASK";
    pub const UPDATE_LEAD_SCORE: &str = "UPDATE_LEAD_SCORE";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignTemplate {
    pub template_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub subject: Option<String>,
    pub content: String,
}

impl CampaignTemplate {
    pub fn new(org_id: Uuid, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            template_id: Uuid::new_v4(),
            org_id,
            name: name.into(),
            subject: None,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DripCampaign {
    pub campaign_id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub is_active: bool,
}

impl DripCampaign {
    pub fn new(org_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            campaign_id: Uuid::new_v4(),
            org_id,
            name: name.into(),
            is_active: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DripCampaignStep {
    pub step_id: Uuid,
    pub campaign_id: Uuid,
    pub org_id: Uuid,
    pub step_order: i32,
    /// Delay after the previous step; run times accumulate from the moment
    /// the campaign is scheduled, not from each step's actual fire time.
    pub delay_days: i64,
    pub delay_hours: i64,
    pub template_id: Option<Uuid>,
    pub action_type: String,
    pub is_active: bool,
}

/// One scheduled (campaign, step, contact) delivery. A record is created at
/// schedule time and flipped to executed exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DripStepExecution {
    pub execution_id: Uuid,
    pub org_id: Uuid,
    pub campaign_id: Uuid,
    pub step_id: Uuid,
    pub contact_id: Uuid,
    pub run_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
}
