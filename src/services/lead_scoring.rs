// Lead scoring engine. Activity signals bump the score buckets, and a lead
// crossing the conversion threshold is turned into a deal exactly once.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Deal, LeadScore, ActivityKind, AUTO_CONVERT_THRESHOLD};
use crate::notify::{kinds, Notifier};
use crate::store::Store;
use crate::tenant::TenantScope;

pub struct LeadScoringService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl LeadScoringService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Records one activity signal for a lead. The score row is created
    /// lazily on first use. Unknown activity kinds are a pure no-op: the
    /// current score (if any) is returned unchanged.
    pub async fn record_activity(
        &self,
        scope: &TenantScope,
        lead_id: Uuid,
        activity_type: &str,
    ) -> AppResult<LeadScore> {
        let lead = self
            .store
            .lead(scope.org_id, lead_id)
            .await?
            .ok_or_else(|| AppError::not_found("lead"))?;

        let mut score = self
            .store
            .lead_score(scope.org_id, lead_id)
            .await?
            .unwrap_or_else(|| LeadScore::new(scope.org_id, lead_id));

        let Some(kind) = ActivityKind::parse(activity_type) else {
            warn!(activity_type, %lead_id, "unknown activity type, ignoring");
            return Ok(score);
        };

        score.apply(kind);
        score.last_activity_at = Some(Utc::now());
        self.store.save_lead_score(score.clone()).await?;

        self.check_auto_convert(scope, &lead.name, lead.owner_id, &mut score)
            .await?;

        Ok(score)
    }

    /// Sets the score components directly (manual adjustment path).
    pub async fn set_scores(
        &self,
        scope: &TenantScope,
        lead_id: Uuid,
        engagement: i32,
        demographic: i32,
        behavior: i32,
    ) -> AppResult<LeadScore> {
        if self.store.lead(scope.org_id, lead_id).await?.is_none() {
            return Err(AppError::not_found("lead"));
        }

        let mut score = self
            .store
            .lead_score(scope.org_id, lead_id)
            .await?
            .unwrap_or_else(|| LeadScore::new(scope.org_id, lead_id));

        score.engagement_score = engagement;
        score.demographic_score = demographic;
        score.behavior_score = behavior;
        score.last_activity_at = Some(Utc::now());
        score.recalculate();
        self.store.save_lead_score(score.clone()).await?;

        Ok(score)
    }

    /// Recomputes derived totals and grades for every score row. Driven by
    /// the daily scoring pass.
    pub async fn refresh_scores(&self, scope: &TenantScope) -> AppResult<usize> {
        let scores = self.store.lead_scores(scope.org_id).await?;
        let count = scores.len();
        for mut score in scores {
            score.recalculate();
            self.store.save_lead_score(score).await?;
        }
        Ok(count)
    }

    pub async fn all_scores(&self, scope: &TenantScope) -> AppResult<Vec<LeadScore>> {
        self.store.lead_scores(scope.org_id).await
    }

    pub async fn top_leads(&self, scope: &TenantScope, min_score: i32) -> AppResult<Vec<LeadScore>> {
        let mut scores: Vec<LeadScore> = self
            .store
            .lead_scores(scope.org_id)
            .await?
            .into_iter()
            .filter(|s| s.total_score >= min_score)
            .collect();
        scores.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        Ok(scores)
    }

    /// Converts a lead into a "Qualification" deal once its total score
    /// reaches the threshold. Guarded by the monotonic `auto_converted`
    /// flag so repeated activity never double-fires.
    async fn check_auto_convert(
        &self,
        scope: &TenantScope,
        lead_name: &str,
        owner_id: Uuid,
        score: &mut LeadScore,
    ) -> AppResult<()> {
        if score.total_score < AUTO_CONVERT_THRESHOLD || score.auto_converted {
            return Ok(());
        }

        let deal = Deal::new(
            scope.org_id,
            owner_id,
            format!("Opportunity from {}", lead_name),
            "Qualification",
        );
        self.store.save_deal(deal).await?;

        score.auto_converted = true;
        self.store.save_lead_score(score.clone()).await?;

        info!(lead = lead_name, total = score.total_score, "lead auto-converted");

        self.notifier
            .send(
                scope.org_id,
                owner_id,
                kinds::LEAD_CONVERTED,
                "High-scoring lead auto-converted",
                &format!(
                    "Lead '{}' with score {} has been automatically converted to an opportunity",
                    lead_name, score.total_score
                ),
            )
            .await;

        Ok(())
    }
}
