// In-memory store. Arenas are keyed by org id, so a query can only ever see
// the tenant it was asked about. Mutations happen under a single write lock,
// which makes read-modify-write sequences (breach flags, execution claims)
// atomic with respect to overlapping scans.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    Activity, AutoAssignmentRule, BreachKind, CampaignTemplate, Contact, Deal, DealStageRule,
    DripCampaign, DripCampaignStep, DripStepExecution, FollowUpRule, Lead, LeadScore, Member,
    Notification, Organization, SlaPolicy, Ticket, TicketCategory,
};
use crate::store::Store;

#[derive(Default)]
struct OrgArena {
    organization: Option<Organization>,
    members: Vec<Member>,
    leads: HashMap<Uuid, Lead>,
    contacts: HashMap<Uuid, Contact>,
    deals: HashMap<Uuid, Deal>,
    activities: Vec<Activity>,
    tickets: HashMap<Uuid, Ticket>,
    categories: HashMap<Uuid, TicketCategory>,
    // Keyed by lead id: a lead owns at most one score row.
    lead_scores: HashMap<Uuid, LeadScore>,
    deal_stage_rules: Vec<DealStageRule>,
    assignment_rules: Vec<AutoAssignmentRule>,
    follow_up_rules: Vec<FollowUpRule>,
    sla_policies: Vec<SlaPolicy>,
    campaigns: HashMap<Uuid, DripCampaign>,
    steps: Vec<DripCampaignStep>,
    templates: HashMap<Uuid, CampaignTemplate>,
    executions: Vec<DripStepExecution>,
    notifications: Vec<Notification>,
    follow_up_marks: HashMap<(Uuid, Uuid), DateTime<Utc>>,
    rotation_cursors: HashMap<Uuid, usize>,
}

#[derive(Default)]
pub struct InMemoryStore {
    arenas: RwLock<HashMap<Uuid, OrgArena>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn arena<'a>(arenas: &'a HashMap<Uuid, OrgArena>, org_id: Uuid) -> AppResult<&'a OrgArena> {
    arenas
        .get(&org_id)
        .ok_or_else(|| AppError::not_found("organization"))
}

fn arena_mut<'a>(
    arenas: &'a mut HashMap<Uuid, OrgArena>,
    org_id: Uuid,
) -> AppResult<&'a mut OrgArena> {
    arenas
        .get_mut(&org_id)
        .ok_or_else(|| AppError::not_found("organization"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_organization(&self, org: Organization) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        let arena = arenas.entry(org.org_id).or_default();
        arena.organization = Some(org);
        Ok(())
    }

    async fn organizations(&self) -> AppResult<Vec<Organization>> {
        let arenas = self.arenas.read().await;
        let mut orgs: Vec<Organization> = arenas
            .values()
            .filter_map(|a| a.organization.clone())
            .collect();
        orgs.sort_by_key(|o| (o.created_at, o.org_id));
        Ok(orgs)
    }

    async fn insert_member(&self, member: Member) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, member.org_id)?.members.push(member);
        Ok(())
    }

    async fn members(&self, org_id: Uuid) -> AppResult<Vec<Member>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.members.clone())
    }

    async fn member(&self, org_id: Uuid, member_id: Uuid) -> AppResult<Option<Member>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?
            .members
            .iter()
            .find(|m| m.member_id == member_id)
            .cloned())
    }

    async fn insert_lead(&self, lead: Lead) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, lead.org_id)?
            .leads
            .insert(lead.lead_id, lead);
        Ok(())
    }

    async fn lead(&self, org_id: Uuid, lead_id: Uuid) -> AppResult<Option<Lead>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.leads.get(&lead_id).cloned())
    }

    async fn leads(&self, org_id: Uuid) -> AppResult<Vec<Lead>> {
        let arenas = self.arenas.read().await;
        let mut leads: Vec<Lead> = arena(&arenas, org_id)?.leads.values().cloned().collect();
        leads.sort_by_key(|l| (l.created_at, l.lead_id));
        Ok(leads)
    }

    async fn insert_contact(&self, contact: Contact) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, contact.org_id)?
            .contacts
            .insert(contact.contact_id, contact);
        Ok(())
    }

    async fn contact(&self, org_id: Uuid, contact_id: Uuid) -> AppResult<Option<Contact>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.contacts.get(&contact_id).cloned())
    }

    async fn contacts(&self, org_id: Uuid) -> AppResult<Vec<Contact>> {
        let arenas = self.arenas.read().await;
        let mut contacts: Vec<Contact> =
            arena(&arenas, org_id)?.contacts.values().cloned().collect();
        contacts.sort_by_key(|c| (c.created_at, c.contact_id));
        Ok(contacts)
    }

    async fn save_deal(&self, deal: Deal) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, deal.org_id)?
            .deals
            .insert(deal.deal_id, deal);
        Ok(())
    }

    async fn deal(&self, org_id: Uuid, deal_id: Uuid) -> AppResult<Option<Deal>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.deals.get(&deal_id).cloned())
    }

    async fn deals(&self, org_id: Uuid) -> AppResult<Vec<Deal>> {
        let arenas = self.arenas.read().await;
        let mut deals: Vec<Deal> = arena(&arenas, org_id)?.deals.values().cloned().collect();
        deals.sort_by_key(|d| (d.created_at, d.deal_id));
        Ok(deals)
    }

    async fn add_activity(&self, activity: Activity) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, activity.org_id)?
            .activities
            .push(activity);
        Ok(())
    }

    async fn activities(&self, org_id: Uuid) -> AppResult<Vec<Activity>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.activities.clone())
    }

    async fn save_ticket(&self, ticket: Ticket) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, ticket.org_id)?
            .tickets
            .insert(ticket.ticket_id, ticket);
        Ok(())
    }

    async fn ticket(&self, org_id: Uuid, ticket_id: Uuid) -> AppResult<Option<Ticket>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.tickets.get(&ticket_id).cloned())
    }

    async fn tickets(&self, org_id: Uuid) -> AppResult<Vec<Ticket>> {
        let arenas = self.arenas.read().await;
        let mut tickets: Vec<Ticket> = arena(&arenas, org_id)?.tickets.values().cloned().collect();
        tickets.sort_by_key(|t| (t.created_at, t.ticket_id));
        Ok(tickets)
    }

    async fn open_ticket_count(&self, org_id: Uuid, member_id: Uuid) -> AppResult<i64> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?
            .tickets
            .values()
            .filter(|t| t.assignee_id == Some(member_id) && t.status == crate::models::ticket_status::OPEN)
            .count() as i64)
    }

    async fn claim_breach(
        &self,
        org_id: Uuid,
        ticket_id: Uuid,
        kind: BreachKind,
    ) -> AppResult<bool> {
        let mut arenas = self.arenas.write().await;
        let ticket = arena_mut(&mut arenas, org_id)?
            .tickets
            .get_mut(&ticket_id)
            .ok_or_else(|| AppError::not_found("ticket"))?;
        let flag = match kind {
            BreachKind::FirstResponse => &mut ticket.first_response_breached,
            BreachKind::Resolution => &mut ticket.resolution_breached,
        };
        if *flag {
            return Ok(false);
        }
        *flag = true;
        Ok(true)
    }

    async fn insert_category(&self, category: TicketCategory) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, category.org_id)?
            .categories
            .insert(category.category_id, category);
        Ok(())
    }

    async fn category(&self, org_id: Uuid, category_id: Uuid) -> AppResult<Option<TicketCategory>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.categories.get(&category_id).cloned())
    }

    async fn lead_score(&self, org_id: Uuid, lead_id: Uuid) -> AppResult<Option<LeadScore>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.lead_scores.get(&lead_id).cloned())
    }

    async fn save_lead_score(&self, score: LeadScore) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, score.org_id)?
            .lead_scores
            .insert(score.lead_id, score);
        Ok(())
    }

    async fn lead_scores(&self, org_id: Uuid) -> AppResult<Vec<LeadScore>> {
        let arenas = self.arenas.read().await;
        let mut scores: Vec<LeadScore> =
            arena(&arenas, org_id)?.lead_scores.values().cloned().collect();
        scores.sort_by_key(|s| (s.created_at, s.score_id));
        Ok(scores)
    }

    async fn insert_deal_stage_rule(&self, rule: DealStageRule) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, rule.org_id)?
            .deal_stage_rules
            .push(rule);
        Ok(())
    }

    async fn deal_stage_rules(&self, org_id: Uuid) -> AppResult<Vec<DealStageRule>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.deal_stage_rules.clone())
    }

    async fn insert_assignment_rule(&self, rule: AutoAssignmentRule) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, rule.org_id)?
            .assignment_rules
            .push(rule);
        Ok(())
    }

    async fn assignment_rules(&self, org_id: Uuid) -> AppResult<Vec<AutoAssignmentRule>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.assignment_rules.clone())
    }

    async fn insert_follow_up_rule(&self, rule: FollowUpRule) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, rule.org_id)?
            .follow_up_rules
            .push(rule);
        Ok(())
    }

    async fn follow_up_rules(&self, org_id: Uuid) -> AppResult<Vec<FollowUpRule>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.follow_up_rules.clone())
    }

    async fn insert_sla_policy(&self, policy: SlaPolicy) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, policy.org_id)?.sla_policies.push(policy);
        Ok(())
    }

    async fn sla_policies(&self, org_id: Uuid) -> AppResult<Vec<SlaPolicy>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.sla_policies.clone())
    }

    async fn insert_campaign(&self, campaign: DripCampaign) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, campaign.org_id)?
            .campaigns
            .insert(campaign.campaign_id, campaign);
        Ok(())
    }

    async fn drip_campaign(&self, org_id: Uuid, campaign_id: Uuid) -> AppResult<Option<DripCampaign>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.campaigns.get(&campaign_id).cloned())
    }

    async fn insert_step(&self, step: DripCampaignStep) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, step.org_id)?.steps.push(step);
        Ok(())
    }

    async fn drip_steps(&self, org_id: Uuid, campaign_id: Uuid) -> AppResult<Vec<DripCampaignStep>> {
        let arenas = self.arenas.read().await;
        let mut steps: Vec<DripCampaignStep> = arena(&arenas, org_id)?
            .steps
            .iter()
            .filter(|s| s.campaign_id == campaign_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| (s.step_order, s.step_id));
        Ok(steps)
    }

    async fn insert_template(&self, template: CampaignTemplate) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, template.org_id)?
            .templates
            .insert(template.template_id, template);
        Ok(())
    }

    async fn template(&self, org_id: Uuid, template_id: Uuid) -> AppResult<Option<CampaignTemplate>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.templates.get(&template_id).cloned())
    }

    async fn find_execution(
        &self,
        org_id: Uuid,
        campaign_id: Uuid,
        step_id: Uuid,
        contact_id: Uuid,
    ) -> AppResult<Option<DripStepExecution>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?
            .executions
            .iter()
            .find(|e| {
                e.campaign_id == campaign_id && e.step_id == step_id && e.contact_id == contact_id
            })
            .cloned())
    }

    async fn insert_execution(&self, execution: DripStepExecution) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, execution.org_id)?
            .executions
            .push(execution);
        Ok(())
    }

    async fn due_executions(&self, org_id: Uuid, now: DateTime<Utc>) -> AppResult<Vec<DripStepExecution>> {
        let arenas = self.arenas.read().await;
        let mut due: Vec<DripStepExecution> = arena(&arenas, org_id)?
            .executions
            .iter()
            .filter(|e| e.executed_at.is_none() && e.run_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|e| (e.run_at, e.execution_id));
        Ok(due)
    }

    async fn mark_execution_done(
        &self,
        org_id: Uuid,
        execution_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut arenas = self.arenas.write().await;
        let arena = arena_mut(&mut arenas, org_id)?;
        let execution = arena
            .executions
            .iter_mut()
            .find(|e| e.execution_id == execution_id)
            .ok_or_else(|| AppError::not_found("drip step execution"))?;
        if execution.executed_at.is_some() {
            return Ok(false);
        }
        execution.executed_at = Some(at);
        Ok(true)
    }

    async fn add_notification(&self, notification: Notification) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, notification.org_id)?
            .notifications
            .push(notification);
        Ok(())
    }

    async fn notifications(&self, org_id: Uuid) -> AppResult<Vec<Notification>> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?.notifications.clone())
    }

    async fn follow_up_fired_since(
        &self,
        org_id: Uuid,
        rule_id: Uuid,
        entity_id: Uuid,
        since: DateTime<Utc>,
    ) -> AppResult<bool> {
        let arenas = self.arenas.read().await;
        Ok(arena(&arenas, org_id)?
            .follow_up_marks
            .get(&(rule_id, entity_id))
            .is_some_and(|at| *at >= since))
    }

    async fn mark_follow_up_fired(
        &self,
        org_id: Uuid,
        rule_id: Uuid,
        entity_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut arenas = self.arenas.write().await;
        arena_mut(&mut arenas, org_id)?
            .follow_up_marks
            .insert((rule_id, entity_id), at);
        Ok(())
    }

    async fn advance_rotation(&self, org_id: Uuid, rule_id: Uuid, len: usize) -> AppResult<usize> {
        if len == 0 {
            return Err(AppError::state("rotation over empty member list"));
        }
        let mut arenas = self.arenas.write().await;
        let arena = arena_mut(&mut arenas, org_id)?;
        let cursor = arena.rotation_cursors.entry(rule_id).or_insert(0);
        let index = *cursor % len;
        *cursor = (*cursor + 1) % len;
        Ok(index)
    }
}
