// SLA engine. Due timestamps are computed once from the resolved policy
// when the ticket is created (or recategorized); the periodic scan detects
// breaches, notifies, and escalates. Breach flags are monotonic: a flag is
// set exactly once and each transition fires exactly one notification.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{BreachKind, SlaPolicy, Ticket};
use crate::notify::{kinds, Notifier};
use crate::store::Store;
use crate::tenant::TenantScope;

/// Outcome of one breach scan, reported back to the job log.
#[derive(Debug, Default)]
pub struct SlaScanResult {
    pub tickets_checked: usize,
    pub breaches_detected: usize,
    pub escalations_triggered: usize,
    pub errors: Vec<String>,
}

pub struct SlaService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    escalation_enabled: bool,
}

impl SlaService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, escalation_enabled: bool) -> Self {
        Self {
            store,
            notifier,
            escalation_enabled,
        }
    }

    /// Resolves the applicable policy and stamps both due timestamps onto
    /// the ticket. Policy edits do not retroactively move existing due
    /// times; callers re-apply on category change.
    pub async fn apply_policy(&self, scope: &TenantScope, ticket_id: Uuid) -> AppResult<Ticket> {
        let mut ticket = self
            .store
            .ticket(scope.org_id, ticket_id)
            .await?
            .ok_or_else(|| AppError::not_found("ticket"))?;

        if let Some(policy) = self.resolve_policy(scope, &ticket).await? {
            ticket.first_response_due =
                Some(ticket.created_at + Duration::minutes(policy.first_response_minutes));
            ticket.resolution_due =
                Some(ticket.created_at + Duration::minutes(policy.resolution_minutes));
            self.store.save_ticket(ticket.clone()).await?;
        } else if let Some(category_id) = ticket.category_id {
            // No policy: fall back to the category's default resolution SLA.
            let category = self.store.category(scope.org_id, category_id).await?;
            if let Some(minutes) = category.and_then(|c| c.default_sla_minutes) {
                ticket.resolution_due = Some(ticket.created_at + Duration::minutes(minutes));
                self.store.save_ticket(ticket.clone()).await?;
            }
        }

        Ok(ticket)
    }

    /// Policy resolution order: exact (category, priority) match first,
    /// then the first active category-only policy, then nothing.
    async fn resolve_policy(
        &self,
        scope: &TenantScope,
        ticket: &Ticket,
    ) -> AppResult<Option<SlaPolicy>> {
        let policies = self.store.sla_policies(scope.org_id).await?;

        if let Some(category_id) = ticket.category_id {
            let exact = policies.iter().find(|p| {
                p.is_active
                    && p.category_id == Some(category_id)
                    && p.priority
                        .as_deref()
                        .is_some_and(|pr| pr.eq_ignore_ascii_case(&ticket.priority))
            });
            if let Some(policy) = exact {
                return Ok(Some(policy.clone()));
            }

            let mut category_only: Vec<&SlaPolicy> = policies
                .iter()
                .filter(|p| p.is_active && p.category_id == Some(category_id) && p.priority.is_none())
                .collect();
            category_only.sort_by_key(|p| p.policy_id);
            if let Some(policy) = category_only.first() {
                return Ok(Some((*policy).clone()));
            }
        }

        Ok(None)
    }

    /// One pass over every ticket carrying a due timestamp. Safe to re-run:
    /// already-breached timers are skipped by the flag guard.
    pub async fn check_breaches(&self, scope: &TenantScope) -> AppResult<SlaScanResult> {
        self.check_breaches_at(scope, Utc::now()).await
    }

    pub async fn check_breaches_at(
        &self,
        scope: &TenantScope,
        now: DateTime<Utc>,
    ) -> AppResult<SlaScanResult> {
        let mut result = SlaScanResult::default();

        let tickets: Vec<Ticket> = self
            .store
            .tickets(scope.org_id)
            .await?
            .into_iter()
            .filter(|t| t.first_response_due.is_some() || t.resolution_due.is_some())
            .collect();
        result.tickets_checked = tickets.len();

        for ticket in tickets {
            // Fully settled tickets have nothing left to breach.
            if ticket.is_closed_out() && ticket.first_response_breached && ticket.resolution_breached
            {
                continue;
            }
            if let Err(e) = self.check_ticket(scope, &ticket, now, &mut result).await {
                result
                    .errors
                    .push(format!("ticket {}: {}", ticket.ticket_id, e));
            }
        }

        Ok(result)
    }

    async fn check_ticket(
        &self,
        scope: &TenantScope,
        ticket: &Ticket,
        now: DateTime<Utc>,
        result: &mut SlaScanResult,
    ) -> AppResult<()> {
        // First response timer.
        if let Some(due) = ticket.first_response_due {
            if !ticket.first_response_breached && ticket.first_response_at.is_none() && now > due {
                self.handle_breach(scope, ticket.ticket_id, BreachKind::FirstResponse, result)
                    .await?;
            }
        }

        // Resolution timer, independent of the first.
        if let Some(due) = ticket.resolution_due {
            if !ticket.resolution_breached && !ticket.is_closed_out() && now > due {
                self.handle_breach(scope, ticket.ticket_id, BreachKind::Resolution, result)
                    .await?;
            }
        }

        Ok(())
    }

    /// Claims the breach edge through the store's test-and-set, then
    /// notifies and escalates. A failed claim means a concurrent scan got
    /// there first; nothing more to do.
    async fn handle_breach(
        &self,
        scope: &TenantScope,
        ticket_id: Uuid,
        kind: BreachKind,
        result: &mut SlaScanResult,
    ) -> AppResult<()> {
        if !self
            .store
            .claim_breach(scope.org_id, ticket_id, kind)
            .await?
        {
            return Ok(());
        }
        result.breaches_detected += 1;

        let mut ticket = self
            .store
            .ticket(scope.org_id, ticket_id)
            .await?
            .ok_or_else(|| AppError::not_found("ticket"))?;

        info!(ticket = %ticket.ticket_id, breach = kind.as_str(), "SLA breached");

        if let Some(assignee_id) = ticket.assignee_id {
            self.notifier
                .send(
                    scope.org_id,
                    assignee_id,
                    kinds::SLA_BREACH,
                    "SLA Breach Alert",
                    &format!(
                        "SLA {} breached for ticket '{}'",
                        kind.as_str(),
                        ticket.subject
                    ),
                )
                .await;
        }

        if self.escalation_enabled {
            self.escalate(scope, &mut ticket, result).await?;
        }

        Ok(())
    }

    async fn escalate(
        &self,
        scope: &TenantScope,
        ticket: &mut Ticket,
        result: &mut SlaScanResult,
    ) -> AppResult<()> {
        let Some(policy) = self.resolve_policy(scope, ticket).await? else {
            return Ok(());
        };
        if !policy.escalation_enabled {
            return Ok(());
        }
        let Some(escalation_assignee) = policy.escalation_assignee_id else {
            warn!(policy = %policy.policy_id, "escalation enabled but no assignee configured");
            return Ok(());
        };

        ticket.assignee_id = Some(escalation_assignee);
        self.store.save_ticket(ticket.clone()).await?;
        result.escalations_triggered += 1;

        info!(ticket = %ticket.ticket_id, to = %escalation_assignee, "ticket escalated");

        self.notifier
            .send(
                scope.org_id,
                escalation_assignee,
                kinds::TICKET_ESCALATED,
                "Ticket Escalated",
                &format!(
                    "Ticket '{}' has been escalated to you due to SLA breach",
                    ticket.subject
                ),
            )
            .await;

        Ok(())
    }
}
