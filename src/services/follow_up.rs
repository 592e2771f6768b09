// Follow-up engine: periodic inactivity scan. Each active rule finds
// entities that have gone quiet and dispatches its action. A per-entity
// daily cooldown keeps repeated scans from producing notification storms.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{Activity, FollowUpRule};
use crate::notify::{kinds, Notifier};
use crate::store::Store;
use crate::tenant::TenantScope;

/// Minimum hours between two follow-up actions for the same (rule, entity).
const COOLDOWN_HOURS: i64 = 24;

#[derive(Debug, Default)]
pub struct FollowUpResult {
    pub actions_fired: usize,
    pub errors: Vec<String>,
}

pub struct FollowUpService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl FollowUpService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn check_and_create_follow_ups(&self, scope: &TenantScope) -> AppResult<FollowUpResult> {
        self.check_at(scope, Utc::now()).await
    }

    pub async fn check_at(&self, scope: &TenantScope, now: DateTime<Utc>) -> AppResult<FollowUpResult> {
        let mut result = FollowUpResult::default();

        let rules: Vec<FollowUpRule> = self
            .store
            .follow_up_rules(scope.org_id)
            .await?
            .into_iter()
            .filter(|r| r.is_active)
            .collect();

        for rule in rules {
            let outcome = match rule.entity_type.as_str() {
                "LEAD" => self.process_leads(scope, &rule, now, &mut result).await,
                "DEAL" => self.process_deals(scope, &rule, now, &mut result).await,
                "CONTACT" => {
                    // Contacts carry no activity timestamp; nothing to scan.
                    debug!(rule = %rule.rule_id, "CONTACT follow-up rules are not scanned");
                    Ok(())
                }
                other => {
                    warn!(entity_type = other, rule = %rule.rule_id, "unknown follow-up entity type");
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                result.errors.push(format!("rule {}: {}", rule.rule_id, e));
            }
        }

        Ok(result)
    }

    /// A lead is stagnant when it has no score row, no recorded activity,
    /// or its last activity predates the rule's cutoff.
    async fn process_leads(
        &self,
        scope: &TenantScope,
        rule: &FollowUpRule,
        now: DateTime<Utc>,
        result: &mut FollowUpResult,
    ) -> AppResult<()> {
        let cutoff = now - Duration::days(rule.inactivity_days);

        for lead in self.store.leads(scope.org_id).await? {
            let score = self.store.lead_score(scope.org_id, lead.lead_id).await?;
            let stagnant = match score.and_then(|s| s.last_activity_at) {
                Some(last) => last < cutoff,
                None => true,
            };
            if !stagnant {
                continue;
            }

            let default_message = format!(
                "Lead '{}' has been inactive for {} days",
                lead.name, rule.inactivity_days
            );
            self.fire(scope, rule, lead.lead_id, lead.owner_id, &default_message, now, result)
                .await?;
        }

        Ok(())
    }

    async fn process_deals(
        &self,
        scope: &TenantScope,
        rule: &FollowUpRule,
        now: DateTime<Utc>,
        result: &mut FollowUpResult,
    ) -> AppResult<()> {
        let cutoff = now - Duration::days(rule.inactivity_days);

        for deal in self.store.deals(scope.org_id).await? {
            if deal.updated_at >= cutoff {
                continue;
            }

            let default_message = format!(
                "Deal '{}' has not been updated for {} days",
                deal.name, rule.inactivity_days
            );
            self.fire(scope, rule, deal.deal_id, deal.owner_id, &default_message, now, result)
                .await?;
        }

        Ok(())
    }

    async fn fire(
        &self,
        scope: &TenantScope,
        rule: &FollowUpRule,
        entity_id: Uuid,
        owner_id: Uuid,
        default_message: &str,
        now: DateTime<Utc>,
        result: &mut FollowUpResult,
    ) -> AppResult<()> {
        if self
            .store
            .follow_up_fired_since(
                scope.org_id,
                rule.rule_id,
                entity_id,
                now - Duration::hours(COOLDOWN_HOURS),
            )
            .await?
        {
            return Ok(());
        }

        let message = rule
            .notification_message
            .as_deref()
            .unwrap_or(default_message);

        match rule.action_type.as_str() {
            "SEND_NOTIFICATION" => {
                self.notifier
                    .send(
                        scope.org_id,
                        owner_id,
                        kinds::FOLLOW_UP_REMINDER,
                        "Follow-up reminder",
                        message,
                    )
                    .await;
            }
            "SEND_EMAIL" => {
                self.notifier
                    .send(
                        scope.org_id,
                        owner_id,
                        kinds::FOLLOW_UP_EMAIL,
                        rule.task_title.as_deref().unwrap_or("Follow-up reminder"),
                        message,
                    )
                    .await;
            }
            "CREATE_TASK" => {
                let description = rule
                    .task_description
                    .clone()
                    .unwrap_or_else(|| message.to_string());
                self.store
                    .add_activity(
                        Activity::new(scope.org_id, "TASK", description).for_member(owner_id),
                    )
                    .await?;
            }
            other => {
                warn!(action = other, rule = %rule.rule_id, "unknown follow-up action, skipping");
                return Ok(());
            }
        }

        self.store
            .mark_follow_up_fired(scope.org_id, rule.rule_id, entity_id, now)
            .await?;
        result.actions_fired += 1;

        Ok(())
    }
}
