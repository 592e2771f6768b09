use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{BreachKind, DripStepExecution};
use crate::tests::{fixtures, TestContext};

#[tokio::test]
async fn tenants_never_see_each_other() {
    let ctx = TestContext::new().await;
    let other = ctx.add_org().await;

    let owner = fixtures::member(ctx.scope.org_id);
    let lead = fixtures::lead(ctx.scope.org_id, owner.member_id);
    ctx.store.insert_member(owner).await.unwrap();
    ctx.store.insert_lead(lead.clone()).await.unwrap();

    assert!(ctx.store.leads(other.org_id).await.unwrap().is_empty());
    assert!(ctx
        .store
        .lead(other.org_id, lead.lead_id)
        .await
        .unwrap()
        .is_none());
    assert!(ctx.store.members(other.org_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_organization_is_an_error() {
    let ctx = TestContext::new().await;
    let err = ctx.store.leads(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn rotation_cursor_cycles_deterministically() {
    let ctx = TestContext::new().await;
    let rule_id = Uuid::new_v4();

    let mut picks = Vec::new();
    for _ in 0..4 {
        picks.push(
            ctx.store
                .advance_rotation(ctx.scope.org_id, rule_id, 3)
                .await
                .unwrap(),
        );
    }
    assert_eq!(picks, vec![0, 1, 2, 0]);

    // Cursors are per rule.
    let other_rule = Uuid::new_v4();
    assert_eq!(
        ctx.store
            .advance_rotation(ctx.scope.org_id, other_rule, 3)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn rotation_over_no_members_is_an_error() {
    let ctx = TestContext::new().await;
    let err = ctx
        .store
        .advance_rotation(ctx.scope.org_id, Uuid::new_v4(), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::State(_)));
}

#[tokio::test]
async fn execution_claim_succeeds_only_once() {
    let ctx = TestContext::new().await;
    let execution = DripStepExecution {
        execution_id: Uuid::new_v4(),
        org_id: ctx.scope.org_id,
        campaign_id: Uuid::new_v4(),
        step_id: Uuid::new_v4(),
        contact_id: Uuid::new_v4(),
        run_at: Utc::now() - Duration::hours(1),
        executed_at: None,
    };
    ctx.store.insert_execution(execution.clone()).await.unwrap();

    let now = Utc::now();
    assert!(ctx
        .store
        .mark_execution_done(ctx.scope.org_id, execution.execution_id, now)
        .await
        .unwrap());
    assert!(!ctx
        .store
        .mark_execution_done(ctx.scope.org_id, execution.execution_id, now)
        .await
        .unwrap());

    // Claimed executions drop out of the due list.
    assert!(ctx
        .store
        .due_executions(ctx.scope.org_id, now)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn breach_claim_succeeds_only_once_per_flag() {
    let ctx = TestContext::new().await;
    let ticket = fixtures::ticket(ctx.scope.org_id, "high");
    ctx.store.save_ticket(ticket.clone()).await.unwrap();

    assert!(ctx
        .store
        .claim_breach(ctx.scope.org_id, ticket.ticket_id, BreachKind::FirstResponse)
        .await
        .unwrap());
    assert!(!ctx
        .store
        .claim_breach(ctx.scope.org_id, ticket.ticket_id, BreachKind::FirstResponse)
        .await
        .unwrap());

    // The two timers claim independently.
    assert!(ctx
        .store
        .claim_breach(ctx.scope.org_id, ticket.ticket_id, BreachKind::Resolution)
        .await
        .unwrap());

    let stored = ctx
        .store
        .ticket(ctx.scope.org_id, ticket.ticket_id)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.first_response_breached);
    assert!(stored.resolution_breached);
}

#[tokio::test]
async fn breach_claim_on_missing_ticket_is_an_error() {
    let ctx = TestContext::new().await;
    let err = ctx
        .store
        .claim_breach(ctx.scope.org_id, Uuid::new_v4(), BreachKind::Resolution)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn drip_steps_come_back_in_step_order() {
    let ctx = TestContext::new().await;
    let campaign = fixtures::campaign(ctx.scope.org_id);
    ctx.store.insert_campaign(campaign.clone()).await.unwrap();

    let late = fixtures::step(ctx.scope.org_id, campaign.campaign_id, 3, 0, 0, "CREATE_TASK");
    let early = fixtures::step(ctx.scope.org_id, campaign.campaign_id, 1, 0, 0, "CREATE_TASK");
    let mid = fixtures::step(ctx.scope.org_id, campaign.campaign_id, 2, 0, 0, "CREATE_TASK");
    ctx.store.insert_step(late).await.unwrap();
    ctx.store.insert_step(early).await.unwrap();
    ctx.store.insert_step(mid).await.unwrap();

    let steps = ctx
        .store
        .drip_steps(ctx.scope.org_id, campaign.campaign_id)
        .await
        .unwrap();
    let orders: Vec<i32> = steps.iter().map(|s| s.step_order).collect();
    assert_eq!(orders, vec![1, 2, 3]);
}

#[tokio::test]
async fn members_keep_insertion_order() {
    let ctx = TestContext::new().await;
    let mut inserted = Vec::new();
    for _ in 0..5 {
        let m = fixtures::member(ctx.scope.org_id);
        ctx.store.insert_member(m.clone()).await.unwrap();
        inserted.push(m.member_id);
    }

    let listed: Vec<Uuid> = ctx
        .store
        .members(ctx.scope.org_id)
        .await
        .unwrap()
        .iter()
        .map(|m| m.member_id)
        .collect();
    assert_eq!(listed, inserted);
}
