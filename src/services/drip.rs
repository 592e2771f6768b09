// Drip campaign scheduling and execution. Scheduling expands the campaign
// into per-contact execution records with absolute run times; the periodic
// runner executes whatever is due. The execution ledger makes both halves
// idempotent across re-runs and restarts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    step_actions, Activity, CampaignTemplate, Contact, DripCampaignStep, DripStepExecution,
    SegmentRule,
};
use crate::notify::{kinds, Notifier};
use crate::services::rule_matcher;
use crate::store::Store;
use crate::tenant::TenantScope;

#[derive(Debug, Default)]
pub struct DripRunResult {
    pub steps_executed: usize,
    pub errors: Vec<String>,
}

pub struct DripCampaignService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl DripCampaignService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Expands the campaign into execution records for each contact. Run
    /// times accumulate from the moment of scheduling: step i fires at
    /// `now + sum(delay_0..=delay_i)`, independent of when earlier steps
    /// actually run. Re-scheduling never duplicates an existing
    /// (step, contact) record.
    pub async fn schedule(
        &self,
        scope: &TenantScope,
        campaign_id: Uuid,
        contact_ids: &[Uuid],
    ) -> AppResult<usize> {
        let campaign = self
            .store
            .drip_campaign(scope.org_id, campaign_id)
            .await?
            .ok_or_else(|| AppError::not_found("drip campaign"))?;
        if !campaign.is_active {
            return Err(AppError::state("campaign is not active"));
        }

        let steps = self.store.drip_steps(scope.org_id, campaign_id).await?;
        let now = Utc::now();
        let mut scheduled = 0;

        for &contact_id in contact_ids {
            if self.store.contact(scope.org_id, contact_id).await?.is_none() {
                warn!(%contact_id, "skipping unknown contact in drip schedule");
                continue;
            }

            let mut offset = Duration::zero();
            for step in steps.iter() {
                if !step.is_active {
                    continue;
                }
                offset = offset + Duration::days(step.delay_days) + Duration::hours(step.delay_hours);

                let existing = self
                    .store
                    .find_execution(scope.org_id, campaign_id, step.step_id, contact_id)
                    .await?;
                if existing.is_some() {
                    continue;
                }

                self.store
                    .insert_execution(DripStepExecution {
                        execution_id: Uuid::new_v4(),
                        org_id: scope.org_id,
                        campaign_id,
                        step_id: step.step_id,
                        contact_id,
                        run_at: now + offset,
                        executed_at: None,
                    })
                    .await?;
                scheduled += 1;
            }
        }

        info!(campaign = %campaign_id, scheduled, "drip campaign scheduled");
        Ok(scheduled)
    }

    /// Executes every due, unexecuted record. Each record is claimed
    /// through the store before dispatch, so a crashed or overlapping run
    /// can never double-send a step.
    pub async fn run_due_steps(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> AppResult<DripRunResult> {
        let mut result = DripRunResult::default();

        for execution in self.store.due_executions(scope.org_id, now).await? {
            let claimed = self
                .store
                .mark_execution_done(scope.org_id, execution.execution_id, now)
                .await?;
            if !claimed {
                continue;
            }
            match self.execute(scope, &execution).await {
                Ok(()) => result.steps_executed += 1,
                Err(e) => result
                    .errors
                    .push(format!("execution {}: {}", execution.execution_id, e)),
            }
        }

        Ok(result)
    }

    async fn execute(&self, scope: &TenantScope, execution: &DripStepExecution) -> AppResult<()> {
        let steps = self
            .store
            .drip_steps(scope.org_id, execution.campaign_id)
            .await?;
        let step = steps
            .iter()
            .find(|s| s.step_id == execution.step_id)
            .ok_or_else(|| AppError::not_found("drip campaign step"))?;
        let contact = self
            .store
            .contact(scope.org_id, execution.contact_id)
            .await?
            .ok_or_else(|| AppError::not_found("contact"))?;

        self.execute_step(scope, step, &contact).await
    }

    /// Dispatches one step action for one contact.
    pub async fn execute_step(
        &self,
        scope: &TenantScope,
        step: &DripCampaignStep,
        contact: &Contact,
    ) -> AppResult<()> {
        match step.action_type.as_str() {
            step_actions::SEND_EMAIL => {
                let template = self.step_template(scope, step).await?;
                let body = render_email(&template.content, contact);
                self.deliver(scope, contact, kinds::CAMPAIGN_EMAIL, &template, body)
                    .await;
            }
            step_actions::SEND_SMS => {
                let template = self.step_template(scope, step).await?;
                let body = render_sms(&template.content, contact);
                self.deliver(scope, contact, kinds::CAMPAIGN_SMS, &template, body)
                    .await;
            }
            step_actions::CREATE_TASK => {
                self.store
                    .add_activity(
                        Activity::new(
                            scope.org_id,
                            "TASK",
                            format!("Follow up with {}", contact.name),
                        )
                        .for_contact(contact.contact_id),
                    )
                    .await?;
            }
            step_actions::UPDATE_LEAD_SCORE => {
                // Placeholder: contacts are not linked to lead scores yet.
                debug!(step = %step.step_id, "UPDATE_LEAD_SCORE step is a no-op");
            }
            other => {
                warn!(action = other, step = %step.step_id, "unknown step action, skipping");
            }
        }
        Ok(())
    }

    /// Filters the tenant's contacts through a segment rule chain.
    pub async fn contacts_matching(
        &self,
        scope: &TenantScope,
        rules: &[SegmentRule],
    ) -> AppResult<Vec<Contact>> {
        let contacts = self.store.contacts(scope.org_id).await?;
        Ok(contacts
            .into_iter()
            .filter(|c| rule_matcher::evaluate(&contact_fields(c), rules))
            .collect())
    }

    async fn step_template(
        &self,
        scope: &TenantScope,
        step: &DripCampaignStep,
    ) -> AppResult<CampaignTemplate> {
        let template_id = step
            .template_id
            .ok_or_else(|| AppError::Validation("send step has no template".to_string()))?;
        self.store
            .template(scope.org_id, template_id)
            .await?
            .ok_or_else(|| AppError::not_found("campaign template"))
    }

    async fn deliver(
        &self,
        scope: &TenantScope,
        contact: &Contact,
        kind: &str,
        template: &CampaignTemplate,
        body: String,
    ) {
        // Campaign sends are routed to the contact's owner when one exists;
        // a real delivery channel would address the contact directly.
        let Some(owner_id) = contact.owner_id else {
            debug!(contact = %contact.contact_id, "contact has no owner, campaign send logged only");
            return;
        };
        let title = template.subject.clone().unwrap_or_else(|| template.name.clone());
        self.notifier
            .send(scope.org_id, owner_id, kind, &title, &body)
            .await;
    }
}

/// Candidate field map used by segment rule evaluation.
pub fn contact_fields(contact: &Contact) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    fields.insert("name".to_string(), contact.name.clone());
    fields.insert("contact_name".to_string(), contact.name.clone());
    if let Some(email) = &contact.email {
        fields.insert("email".to_string(), email.clone());
        fields.insert("contact_email".to_string(), email.clone());
    }
    if let Some(phone) = &contact.phone {
        fields.insert("phone".to_string(), phone.clone());
    }
    fields
}

fn split_name(name: &str) -> (&str, &str) {
    match name.split_once(' ') {
        Some((first, last)) => (first, last),
        None => (name, ""),
    }
}

fn render_email(content: &str, contact: &Contact) -> String {
    let (first, last) = split_name(&contact.name);
    content
        .replace("{firstName}", first)
        .replace("{lastName}", last)
        .replace("{name}", &contact.name)
        .replace("{email}", contact.email.as_deref().unwrap_or(""))
}

fn render_sms(content: &str, contact: &Contact) -> String {
    let (first, _) = split_name(&contact.name);
    content
        .replace("{firstName}", first)
        .replace("{name}", &contact.name)
        .replace("{phone}", contact.phone.as_deref().unwrap_or(""))
}
