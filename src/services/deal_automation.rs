// Deal stage automation: a business trigger against a deal is matched to
// the tenant's stage rules; the single winning rule advances the stage and
// leaves an audit activity behind.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Activity, DealStageRule};
use crate::notify::{kinds, Notifier};
use crate::store::Store;
use crate::tenant::TenantScope;

pub struct DealStageAutomationService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl DealStageAutomationService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Applies the highest-priority active rule matching the deal's current
    /// stage and the trigger. Returns the applied rule, or `None` when no
    /// rule matched (not an error).
    pub async fn on_trigger(
        &self,
        scope: &TenantScope,
        deal_id: Uuid,
        trigger_type: &str,
    ) -> AppResult<Option<DealStageRule>> {
        let mut deal = self
            .store
            .deal(scope.org_id, deal_id)
            .await?
            .ok_or_else(|| AppError::not_found("deal"))?;

        let mut rules: Vec<DealStageRule> = self
            .store
            .deal_stage_rules(scope.org_id)
            .await?
            .into_iter()
            .filter(|r| {
                r.is_active && r.source_stage == deal.stage && r.trigger_type == trigger_type
            })
            .collect();
        // Priority desc, rule id asc: a single deterministic winner.
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.rule_id.cmp(&b.rule_id)));

        let Some(rule) = rules.into_iter().next() else {
            return Ok(None);
        };

        let old_stage = deal.stage.clone();
        deal.stage = rule.target_stage.clone();
        deal.updated_at = chrono::Utc::now();
        self.store.save_deal(deal.clone()).await?;

        self.store
            .add_activity(
                Activity::new(
                    scope.org_id,
                    "DEAL_STAGE_CHANGED",
                    format!(
                        "Deal stage automatically changed from {} to {}",
                        old_stage, rule.target_stage
                    ),
                )
                .for_member(deal.owner_id),
            )
            .await?;

        info!(deal = %deal.deal_id, from = %old_stage, to = %rule.target_stage, "deal stage advanced");

        self.notifier
            .send(
                scope.org_id,
                deal.owner_id,
                kinds::DEAL_STAGE_CHANGED,
                "Deal stage updated",
                &format!(
                    "Deal '{}' has been automatically moved to {}",
                    deal.name, rule.target_stage
                ),
            )
            .await;

        Ok(Some(rule))
    }

    /// Nudges the owner of a deal that has gone quiet. Used by the
    /// scheduled stale-deal scan.
    pub async fn trigger_deal_follow_up(&self, scope: &TenantScope, deal_id: Uuid) -> AppResult<()> {
        let deal = self
            .store
            .deal(scope.org_id, deal_id)
            .await?
            .ok_or_else(|| AppError::not_found("deal"))?;

        self.notifier
            .send(
                scope.org_id,
                deal.owner_id,
                kinds::DEAL_FOLLOW_UP,
                "Deal follow-up reminder",
                &format!(
                    "Deal '{}' in '{}' stage needs your attention",
                    deal.name, deal.stage
                ),
            )
            .await;

        Ok(())
    }
}
