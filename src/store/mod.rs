//! Tenant-scoped repository abstraction.
//!
//! Every method takes the owning `org_id`; implementations must never let
//! one tenant's data answer another tenant's query. The engines only ever
//! talk to this trait, so the persistence engine behind it (in-memory here,
//! a database in a full deployment) is an external collaborator.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Activity, AutoAssignmentRule, BreachKind, CampaignTemplate, Contact, Deal, DealStageRule,
    DripCampaign, DripCampaignStep, DripStepExecution, FollowUpRule, Lead, LeadScore, Member,
    Notification, Organization, SlaPolicy, Ticket, TicketCategory,
};

#[async_trait]
pub trait Store: Send + Sync {
    // Organizations and membership
    async fn insert_organization(&self, org: Organization) -> AppResult<()>;
    async fn organizations(&self) -> AppResult<Vec<Organization>>;
    async fn insert_member(&self, member: Member) -> AppResult<()>;
    /// Members in stable insertion order; rotation and tie-breaking depend
    /// on this order being deterministic.
    async fn members(&self, org_id: Uuid) -> AppResult<Vec<Member>>;
    async fn member(&self, org_id: Uuid, member_id: Uuid) -> AppResult<Option<Member>>;

    // Leads and contacts
    async fn insert_lead(&self, lead: Lead) -> AppResult<()>;
    async fn lead(&self, org_id: Uuid, lead_id: Uuid) -> AppResult<Option<Lead>>;
    async fn leads(&self, org_id: Uuid) -> AppResult<Vec<Lead>>;
    async fn insert_contact(&self, contact: Contact) -> AppResult<()>;
    async fn contact(&self, org_id: Uuid, contact_id: Uuid) -> AppResult<Option<Contact>>;
    async fn contacts(&self, org_id: Uuid) -> AppResult<Vec<Contact>>;

    // Deals
    async fn save_deal(&self, deal: Deal) -> AppResult<()>;
    async fn deal(&self, org_id: Uuid, deal_id: Uuid) -> AppResult<Option<Deal>>;
    async fn deals(&self, org_id: Uuid) -> AppResult<Vec<Deal>>;

    // Activity audit trail
    async fn add_activity(&self, activity: Activity) -> AppResult<()>;
    async fn activities(&self, org_id: Uuid) -> AppResult<Vec<Activity>>;

    // Tickets
    async fn save_ticket(&self, ticket: Ticket) -> AppResult<()>;
    async fn ticket(&self, org_id: Uuid, ticket_id: Uuid) -> AppResult<Option<Ticket>>;
    async fn tickets(&self, org_id: Uuid) -> AppResult<Vec<Ticket>>;
    async fn open_ticket_count(&self, org_id: Uuid, member_id: Uuid) -> AppResult<i64>;
    /// Tests and flips one breach flag in a single atomic step. Returns
    /// `false` when the flag was already set, so overlapping scans cannot
    /// both claim the same breach edge.
    async fn claim_breach(&self, org_id: Uuid, ticket_id: Uuid, kind: BreachKind)
        -> AppResult<bool>;
    async fn insert_category(&self, category: TicketCategory) -> AppResult<()>;
    async fn category(&self, org_id: Uuid, category_id: Uuid) -> AppResult<Option<TicketCategory>>;

    // Lead scores
    async fn lead_score(&self, org_id: Uuid, lead_id: Uuid) -> AppResult<Option<LeadScore>>;
    async fn save_lead_score(&self, score: LeadScore) -> AppResult<()>;
    async fn lead_scores(&self, org_id: Uuid) -> AppResult<Vec<LeadScore>>;

    // Rules and policies
    async fn insert_deal_stage_rule(&self, rule: DealStageRule) -> AppResult<()>;
    async fn deal_stage_rules(&self, org_id: Uuid) -> AppResult<Vec<DealStageRule>>;
    async fn insert_assignment_rule(&self, rule: AutoAssignmentRule) -> AppResult<()>;
    async fn assignment_rules(&self, org_id: Uuid) -> AppResult<Vec<AutoAssignmentRule>>;
    async fn insert_follow_up_rule(&self, rule: FollowUpRule) -> AppResult<()>;
    async fn follow_up_rules(&self, org_id: Uuid) -> AppResult<Vec<FollowUpRule>>;
    async fn insert_sla_policy(&self, policy: SlaPolicy) -> AppResult<()>;
    async fn sla_policies(&self, org_id: Uuid) -> AppResult<Vec<SlaPolicy>>;

    // Drip campaigns
    async fn insert_campaign(&self, campaign: DripCampaign) -> AppResult<()>;
    async fn drip_campaign(&self, org_id: Uuid, campaign_id: Uuid) -> AppResult<Option<DripCampaign>>;
    async fn insert_step(&self, step: DripCampaignStep) -> AppResult<()>;
    /// Steps for one campaign, ordered by `step_order`.
    async fn drip_steps(&self, org_id: Uuid, campaign_id: Uuid) -> AppResult<Vec<DripCampaignStep>>;
    async fn insert_template(&self, template: CampaignTemplate) -> AppResult<()>;
    async fn template(&self, org_id: Uuid, template_id: Uuid) -> AppResult<Option<CampaignTemplate>>;

    // Drip execution ledger
    async fn find_execution(
        &self,
        org_id: Uuid,
        campaign_id: Uuid,
        step_id: Uuid,
        contact_id: Uuid,
    ) -> AppResult<Option<DripStepExecution>>;
    async fn insert_execution(&self, execution: DripStepExecution) -> AppResult<()>;
    async fn due_executions(&self, org_id: Uuid, now: DateTime<Utc>) -> AppResult<Vec<DripStepExecution>>;
    /// Marks an execution done. Returns `false` when it was already done,
    /// so concurrent runners cannot both claim the same step.
    async fn mark_execution_done(
        &self,
        org_id: Uuid,
        execution_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    // Notifications
    async fn add_notification(&self, notification: Notification) -> AppResult<()>;
    async fn notifications(&self, org_id: Uuid) -> AppResult<Vec<Notification>>;

    // Follow-up cooldown marks
    async fn follow_up_fired_since(
        &self,
        org_id: Uuid,
        rule_id: Uuid,
        entity_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<bool>;
    async fn mark_follow_up_fired(
        &self,
        org_id: Uuid,
        rule_id: Uuid,
        entity_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Advances the round-robin cursor for an assignment rule and returns
    /// the index to use among `len` candidates.
    async fn advance_rotation(&self, org_id: Uuid, rule_id: Uuid, len: usize) -> AppResult<usize>;
}
