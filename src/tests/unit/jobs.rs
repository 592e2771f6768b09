use crate::config::AutomationConfig;
use crate::jobs::{JobConfig, JobError, JobScheduler};
use crate::tests::{fixtures, TestContext};

async fn scheduler_for(ctx: &TestContext) -> JobScheduler {
    JobScheduler::new(
        ctx.store.clone(),
        ctx.notifier.clone(),
        AutomationConfig::default(),
        JobConfig::default(),
    )
    .await
    .expect("build scheduler")
}

#[tokio::test]
async fn manual_run_covers_every_job() {
    let ctx = TestContext::new().await;
    let scheduler = scheduler_for(&ctx).await;

    for job in [
        "sla_check",
        "drip_runner",
        "lead_nurturing",
        "deal_follow_up",
        "follow_up_scan",
        "score_refresh",
    ] {
        let summary = scheduler.run_job_now(job).await.expect("job should run");
        assert!(summary.errors.is_empty(), "job {} reported errors", job);
    }

    assert!(scheduler.get_execution_logs().await.is_empty());
}

#[tokio::test]
async fn unknown_job_name_is_a_config_error() {
    let ctx = TestContext::new().await;
    let scheduler = scheduler_for(&ctx).await;

    let err = scheduler.run_job_now("defrag_disks").await.unwrap_err();
    assert!(matches!(err, JobError::ConfigError(_)));
}

#[tokio::test]
async fn manual_sla_run_picks_up_breaches() {
    let ctx = TestContext::new().await;
    let assignee = fixtures::member(ctx.scope.org_id);
    ctx.store.insert_member(assignee.clone()).await.unwrap();

    let now = chrono::Utc::now();
    let mut ticket = fixtures::ticket(ctx.scope.org_id, "high");
    ticket.assignee_id = Some(assignee.member_id);
    ticket.created_at = now - chrono::Duration::minutes(90);
    ticket.first_response_due = Some(ticket.created_at + chrono::Duration::minutes(60));
    ctx.store.save_ticket(ticket).await.unwrap();

    let scheduler = scheduler_for(&ctx).await;
    let summary = scheduler.run_job_now("sla_check").await.unwrap();

    assert_eq!(summary.items_processed, 1);
    assert_eq!(
        ctx.notifications_of_kind(crate::notify::kinds::SLA_BREACH)
            .await
            .len(),
        1
    );
}
