// Per-scan run functions invoked by the scheduler. Every run iterates
// tenants independently: one organization's failure is recorded and the
// remaining organizations are still processed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{error, info};

use crate::config::AutomationConfig;
use crate::notify::{kinds, Notifier};
use crate::services::{
    DealStageAutomationService, DripCampaignService, FollowUpService, LeadScoringService,
    SlaService,
};
use crate::store::Store;
use crate::tenant::TenantScope;

/// Aggregated outcome of one scheduled run across all tenants.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub items_processed: usize,
    pub errors: Vec<String>,
}

impl RunSummary {
    fn record<T>(&mut self, org: uuid::Uuid, outcome: Result<T, crate::error::AppError>, items: impl Fn(&T) -> usize) {
        match outcome {
            Ok(value) => self.items_processed += items(&value),
            Err(e) => {
                error!(%org, "scan failed for organization: {}", e);
                self.errors.push(format!("org {}: {}", org, e));
            }
        }
    }
}

/// Hourly: nudge owners of leads with no activity for the configured
/// number of days.
pub async fn run_lead_nurturing(
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    config: &AutomationConfig,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let cutoff = Utc::now() - Duration::days(config.lead_inactive_days);

    let orgs = match store.organizations().await {
        Ok(orgs) => orgs,
        Err(e) => {
            summary.errors.push(e.to_string());
            return summary;
        }
    };

    for org in orgs {
        let scope = TenantScope::system(org.org_id);
        let outcome = async {
            let mut nudged = 0usize;
            for lead in store.leads(scope.org_id).await? {
                let last_activity = store
                    .lead_score(scope.org_id, lead.lead_id)
                    .await?
                    .and_then(|s| s.last_activity_at);
                let inactive = match last_activity {
                    Some(last) => last < cutoff,
                    None => lead.created_at < cutoff,
                };
                if !inactive {
                    continue;
                }
                notifier
                    .send(
                        scope.org_id,
                        lead.owner_id,
                        kinds::LEAD_NURTURING,
                        "Lead nurturing reminder",
                        &format!("Lead '{}' needs nurturing", lead.name),
                    )
                    .await;
                nudged += 1;
            }
            Ok::<usize, crate::error::AppError>(nudged)
        }
        .await;
        summary.record(org.org_id, outcome, |n| *n);
    }

    summary
}

/// Every two hours: follow up on deals stuck in the configured stage.
pub async fn run_deal_follow_ups(
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    config: &AutomationConfig,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let cutoff = Utc::now() - Duration::days(config.deal_stale_days);
    let service = DealStageAutomationService::new(store.clone(), notifier);

    let orgs = match store.organizations().await {
        Ok(orgs) => orgs,
        Err(e) => {
            summary.errors.push(e.to_string());
            return summary;
        }
    };

    for org in orgs {
        let scope = TenantScope::system(org.org_id);
        let outcome = async {
            let mut followed_up = 0usize;
            for deal in store.deals(scope.org_id).await? {
                if deal.stage != config.deal_stale_stage || deal.updated_at >= cutoff {
                    continue;
                }
                service.trigger_deal_follow_up(&scope, deal.deal_id).await?;
                followed_up += 1;
            }
            Ok::<usize, crate::error::AppError>(followed_up)
        }
        .await;
        summary.record(org.org_id, outcome, |n| *n);
    }

    summary
}

/// Every 30 minutes: SLA breach scan.
pub async fn run_sla_scan(
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    config: &AutomationConfig,
) -> RunSummary {
    let mut summary = RunSummary::default();
    let service = SlaService::new(store.clone(), notifier, config.sla_auto_escalation_enabled);

    let orgs = match store.organizations().await {
        Ok(orgs) => orgs,
        Err(e) => {
            summary.errors.push(e.to_string());
            return summary;
        }
    };

    for org in orgs {
        let scope = TenantScope::system(org.org_id);
        let outcome = service.check_breaches(&scope).await;
        if let Ok(result) = &outcome {
            if result.breaches_detected > 0 {
                info!(
                    org = %org.org_id,
                    breaches = result.breaches_detected,
                    escalations = result.escalations_triggered,
                    "SLA scan found breaches"
                );
            }
            summary.errors.extend(result.errors.iter().cloned());
        }
        summary.record(org.org_id, outcome, |r| r.tickets_checked);
    }

    summary
}

/// Every 15 minutes: execute due drip campaign steps.
pub async fn run_drip_steps(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> RunSummary {
    let mut summary = RunSummary::default();
    let service = DripCampaignService::new(store.clone(), notifier);

    let orgs = match store.organizations().await {
        Ok(orgs) => orgs,
        Err(e) => {
            summary.errors.push(e.to_string());
            return summary;
        }
    };

    for org in orgs {
        let scope = TenantScope::system(org.org_id);
        let outcome = service.run_due_steps(&scope, Utc::now()).await;
        if let Ok(result) = &outcome {
            summary.errors.extend(result.errors.iter().cloned());
        }
        summary.record(org.org_id, outcome, |r| r.steps_executed);
    }

    summary
}

/// Daily: follow-up rule scan.
pub async fn run_follow_up_rules(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> RunSummary {
    let mut summary = RunSummary::default();
    let service = FollowUpService::new(store.clone(), notifier);

    let orgs = match store.organizations().await {
        Ok(orgs) => orgs,
        Err(e) => {
            summary.errors.push(e.to_string());
            return summary;
        }
    };

    for org in orgs {
        let scope = TenantScope::system(org.org_id);
        let outcome = service.check_and_create_follow_ups(&scope).await;
        if let Ok(result) = &outcome {
            summary.errors.extend(result.errors.iter().cloned());
        }
        summary.record(org.org_id, outcome, |r| r.actions_fired);
    }

    summary
}

/// Daily: recompute derived score totals and grades.
pub async fn run_daily_scoring(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> RunSummary {
    let mut summary = RunSummary::default();
    let service = LeadScoringService::new(store.clone(), notifier);

    let orgs = match store.organizations().await {
        Ok(orgs) => orgs,
        Err(e) => {
            summary.errors.push(e.to_string());
            return summary;
        }
    };

    for org in orgs {
        let scope = TenantScope::system(org.org_id);
        let outcome = service.refresh_scores(&scope).await;
        summary.record(org.org_id, outcome, |n| *n);
    }

    summary
}
