// Ticket auto-assignment. Rules are tried in priority order; the first rule
// whose optional category/priority filters match picks the assignee through
// its strategy. Falls back to the category's default assignee.

use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{strategies, AutoAssignmentRule, Member, Ticket};
use crate::notify::{kinds, Notifier};
use crate::store::Store;
use crate::tenant::TenantScope;

pub struct TicketAssignmentService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
}

impl TicketAssignmentService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Assigns a ticket and returns the chosen member, or `None` when no
    /// rule applied and the category has no default assignee.
    pub async fn assign(&self, scope: &TenantScope, ticket_id: Uuid) -> AppResult<Option<Member>> {
        let mut ticket = self
            .store
            .ticket(scope.org_id, ticket_id)
            .await?
            .ok_or_else(|| AppError::not_found("ticket"))?;

        let mut rules: Vec<AutoAssignmentRule> = self
            .store
            .assignment_rules(scope.org_id)
            .await?
            .into_iter()
            .filter(|r| r.is_active)
            .collect();
        rules.sort_by(|a, b| {
            b.rule_priority
                .cmp(&a.rule_priority)
                .then(a.rule_id.cmp(&b.rule_id))
        });

        for rule in rules {
            if !rule_matches(&ticket, &rule) {
                continue;
            }
            if let Some(assignee) = self.resolve_assignee(scope, &rule).await? {
                return self.commit(scope, &mut ticket, assignee).await.map(Some);
            }
        }

        // No rule produced an assignee; try the category default.
        if let Some(category_id) = ticket.category_id {
            let category = self.store.category(scope.org_id, category_id).await?;
            if let Some(default_id) = category.and_then(|c| c.default_assignee_id) {
                if let Some(assignee) = self.store.member(scope.org_id, default_id).await? {
                    return self.commit(scope, &mut ticket, assignee).await.map(Some);
                }
            }
        }

        Ok(None)
    }

    async fn commit(
        &self,
        scope: &TenantScope,
        ticket: &mut Ticket,
        assignee: Member,
    ) -> AppResult<Member> {
        ticket.assignee_id = Some(assignee.member_id);
        self.store.save_ticket(ticket.clone()).await?;

        info!(ticket = %ticket.ticket_id, assignee = %assignee.member_id, "ticket auto-assigned");

        self.notifier
            .send(
                scope.org_id,
                assignee.member_id,
                kinds::TICKET_ASSIGNED,
                "New ticket assigned",
                &format!("Ticket '{}' has been assigned to you", ticket.subject),
            )
            .await;

        Ok(assignee)
    }

    async fn resolve_assignee(
        &self,
        scope: &TenantScope,
        rule: &AutoAssignmentRule,
    ) -> AppResult<Option<Member>> {
        match rule.strategy.as_str() {
            strategies::SPECIFIC_AGENT => match rule.specific_assignee_id {
                Some(id) => self.store.member(scope.org_id, id).await,
                None => Ok(None),
            },
            strategies::ROUND_ROBIN => self.round_robin(scope, rule).await,
            strategies::LOAD_BALANCED => self.least_busy(scope, rule).await,
            strategies::SKILL_BASED => {
                // No skill data is modeled; pick uniformly at random.
                let members = self.store.members(scope.org_id).await?;
                if members.is_empty() {
                    return Ok(None);
                }
                let index = rand::thread_rng().gen_range(0..members.len());
                Ok(members.into_iter().nth(index))
            }
            other => {
                warn!(strategy = other, rule = %rule.rule_id, "unknown assignment strategy, skipping rule");
                Ok(None)
            }
        }
    }

    /// True rotation: the per-rule cursor lives in the store and advances
    /// on every pick, so consecutive tickets go to consecutive members.
    async fn round_robin(
        &self,
        scope: &TenantScope,
        rule: &AutoAssignmentRule,
    ) -> AppResult<Option<Member>> {
        let members = self.store.members(scope.org_id).await?;
        if members.is_empty() {
            return Ok(None);
        }
        let index = self
            .store
            .advance_rotation(scope.org_id, rule.rule_id, members.len())
            .await?;
        Ok(members.into_iter().nth(index))
    }

    /// Member with the fewest open tickets; ties go to the earlier member
    /// in the stable org order. Members at the rule's per-agent cap are
    /// excluded.
    async fn least_busy(
        &self,
        scope: &TenantScope,
        rule: &AutoAssignmentRule,
    ) -> AppResult<Option<Member>> {
        let members = self.store.members(scope.org_id).await?;
        let mut best: Option<(i64, Member)> = None;
        for member in members {
            let open = self
                .store
                .open_ticket_count(scope.org_id, member.member_id)
                .await?;
            if rule.max_tickets_per_agent.is_some_and(|cap| open >= cap) {
                continue;
            }
            match &best {
                Some((least, _)) if *least <= open => {}
                _ => best = Some((open, member)),
            }
        }
        Ok(best.map(|(_, member)| member))
    }
}

fn rule_matches(ticket: &Ticket, rule: &AutoAssignmentRule) -> bool {
    if let Some(rule_category) = rule.category_id {
        if ticket.category_id != Some(rule_category) {
            return false;
        }
    }
    if let Some(rule_priority) = &rule.priority {
        if !ticket.priority.eq_ignore_ascii_case(rule_priority) {
            return false;
        }
    }
    true
}
