use chrono::{Duration, Utc};

use crate::error::AppError;
use crate::models::{step_actions, CampaignTemplate, SegmentRule};
use crate::notify::kinds;
use crate::services::DripCampaignService;
use crate::tests::{fixtures, TestContext};

fn close_to(actual: chrono::DateTime<Utc>, expected: chrono::DateTime<Utc>) -> bool {
    (actual - expected).num_seconds().abs() < 5
}

#[tokio::test]
async fn run_times_accumulate_from_schedule_time() {
    let ctx = TestContext::new().await;
    let owner = fixtures::member(ctx.scope.org_id);
    let contact = fixtures::contact(ctx.scope.org_id, Some(owner.member_id));
    ctx.store.insert_member(owner).await.unwrap();
    ctx.store.insert_contact(contact.clone()).await.unwrap();

    let campaign = fixtures::campaign(ctx.scope.org_id);
    ctx.store.insert_campaign(campaign.clone()).await.unwrap();
    let step1 = fixtures::step(
        ctx.scope.org_id,
        campaign.campaign_id,
        1,
        1,
        0,
        step_actions::CREATE_TASK,
    );
    let step2 = fixtures::step(
        ctx.scope.org_id,
        campaign.campaign_id,
        2,
        0,
        4,
        step_actions::CREATE_TASK,
    );
    ctx.store.insert_step(step1.clone()).await.unwrap();
    ctx.store.insert_step(step2.clone()).await.unwrap();

    let service = DripCampaignService::new(ctx.store.clone(), ctx.notifier.clone());
    let now = Utc::now();
    let scheduled = service
        .schedule(&ctx.scope, campaign.campaign_id, &[contact.contact_id])
        .await
        .unwrap();
    assert_eq!(scheduled, 2);

    let exec1 = ctx
        .store
        .find_execution(ctx.scope.org_id, campaign.campaign_id, step1.step_id, contact.contact_id)
        .await
        .unwrap()
        .unwrap();
    let exec2 = ctx
        .store
        .find_execution(ctx.scope.org_id, campaign.campaign_id, step2.step_id, contact.contact_id)
        .await
        .unwrap()
        .unwrap();

    // Step two fires one day + four hours after scheduling, not four hours
    // after step one actually ran.
    assert!(close_to(exec1.run_at, now + Duration::days(1)));
    assert!(close_to(exec2.run_at, now + Duration::days(1) + Duration::hours(4)));
}

#[tokio::test]
async fn rescheduling_does_not_duplicate_executions() {
    let ctx = TestContext::new().await;
    let contact = fixtures::contact(ctx.scope.org_id, None);
    ctx.store.insert_contact(contact.clone()).await.unwrap();

    let campaign = fixtures::campaign(ctx.scope.org_id);
    ctx.store.insert_campaign(campaign.clone()).await.unwrap();
    let step = fixtures::step(
        ctx.scope.org_id,
        campaign.campaign_id,
        1,
        0,
        1,
        step_actions::CREATE_TASK,
    );
    ctx.store.insert_step(step).await.unwrap();

    let service = DripCampaignService::new(ctx.store.clone(), ctx.notifier.clone());
    let first = service
        .schedule(&ctx.scope, campaign.campaign_id, &[contact.contact_id])
        .await
        .unwrap();
    let second = service
        .schedule(&ctx.scope, campaign.campaign_id, &[contact.contact_id])
        .await
        .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 0);
}

#[tokio::test]
async fn inactive_campaign_cannot_be_scheduled() {
    let ctx = TestContext::new().await;
    let mut campaign = fixtures::campaign(ctx.scope.org_id);
    campaign.is_active = false;
    ctx.store.insert_campaign(campaign.clone()).await.unwrap();

    let service = DripCampaignService::new(ctx.store.clone(), ctx.notifier.clone());
    let err = service
        .schedule(&ctx.scope, campaign.campaign_id, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::State(_)));
}

#[tokio::test]
async fn due_steps_execute_exactly_once() {
    let ctx = TestContext::new().await;
    let contact = fixtures::contact(ctx.scope.org_id, None);
    ctx.store.insert_contact(contact.clone()).await.unwrap();

    let campaign = fixtures::campaign(ctx.scope.org_id);
    ctx.store.insert_campaign(campaign.clone()).await.unwrap();
    let step = fixtures::step(
        ctx.scope.org_id,
        campaign.campaign_id,
        1,
        0,
        0,
        step_actions::CREATE_TASK,
    );
    ctx.store.insert_step(step).await.unwrap();

    let service = DripCampaignService::new(ctx.store.clone(), ctx.notifier.clone());
    service
        .schedule(&ctx.scope, campaign.campaign_id, &[contact.contact_id])
        .await
        .unwrap();

    let later = Utc::now() + Duration::minutes(1);
    let first = service.run_due_steps(&ctx.scope, later).await.unwrap();
    let second = service.run_due_steps(&ctx.scope, later).await.unwrap();

    assert_eq!(first.steps_executed, 1);
    assert_eq!(second.steps_executed, 0);

    let activities = ctx.store.activities(ctx.scope.org_id).await.unwrap();
    let tasks: Vec<_> = activities.iter().filter(|a| a.kind == "TASK").collect();
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].description.contains(&contact.name));
}

#[tokio::test]
async fn email_step_renders_template_for_contact() {
    let ctx = TestContext::new().await;
    let owner = fixtures::member(ctx.scope.org_id);
    let mut contact = fixtures::contact(ctx.scope.org_id, Some(owner.member_id));
    contact.name = "Ada Lovelace".to_string();
    contact.email = Some("ada@example.com".to_string());
    ctx.store.insert_member(owner.clone()).await.unwrap();
    ctx.store.insert_contact(contact.clone()).await.unwrap();

    let campaign = fixtures::campaign(ctx.scope.org_id);
    ctx.store.insert_campaign(campaign.clone()).await.unwrap();

    let mut template = CampaignTemplate::new(
        ctx.scope.org_id,
        "Welcome",
        "Hi {firstName} {lastName}, we sent this to {email}.",
    );
    template.subject = Some("Welcome aboard".to_string());
    ctx.store.insert_template(template.clone()).await.unwrap();

    let mut step = fixtures::step(
        ctx.scope.org_id,
        campaign.campaign_id,
        1,
        0,
        0,
        step_actions::SEND_EMAIL,
    );
    step.template_id = Some(template.template_id);
    ctx.store.insert_step(step.clone()).await.unwrap();

    let service = DripCampaignService::new(ctx.store.clone(), ctx.notifier.clone());
    service.execute_step(&ctx.scope, &step, &contact).await.unwrap();

    let sent = ctx.notifications_of_kind(kinds::CAMPAIGN_EMAIL).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].member_id, owner.member_id);
    assert_eq!(sent[0].title, "Welcome aboard");
    assert_eq!(sent[0].message, "Hi Ada Lovelace, we sent this to ada@example.com.");
}

#[tokio::test]
async fn contact_without_owner_is_logged_only() {
    use std::sync::Arc;

    use crate::notify::{LogNotifier, Notifier};

    let ctx = TestContext::new().await;
    let contact = fixtures::contact(ctx.scope.org_id, None);
    ctx.store.insert_contact(contact.clone()).await.unwrap();

    let campaign = fixtures::campaign(ctx.scope.org_id);
    let template = CampaignTemplate::new(ctx.scope.org_id, "Ping", "Hello {name}");
    ctx.store.insert_template(template.clone()).await.unwrap();

    let mut step = fixtures::step(
        ctx.scope.org_id,
        campaign.campaign_id,
        1,
        0,
        0,
        step_actions::SEND_EMAIL,
    );
    step.template_id = Some(template.template_id);

    let log_only: Arc<dyn Notifier> = Arc::new(LogNotifier);
    let service = DripCampaignService::new(ctx.store.clone(), log_only);

    // No owner to address: the step completes without persisting anything.
    service.execute_step(&ctx.scope, &step, &contact).await.unwrap();
    assert!(ctx
        .store
        .notifications(ctx.scope.org_id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn send_step_without_template_is_a_validation_error() {
    let ctx = TestContext::new().await;
    let contact = fixtures::contact(ctx.scope.org_id, None);
    ctx.store.insert_contact(contact.clone()).await.unwrap();

    let campaign = fixtures::campaign(ctx.scope.org_id);
    let step = fixtures::step(
        ctx.scope.org_id,
        campaign.campaign_id,
        1,
        0,
        0,
        step_actions::SEND_EMAIL,
    );

    let service = DripCampaignService::new(ctx.store.clone(), ctx.notifier.clone());
    let err = service
        .execute_step(&ctx.scope, &step, &contact)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn segment_rules_filter_campaign_contacts() {
    let ctx = TestContext::new().await;
    let mut corp = fixtures::contact(ctx.scope.org_id, None);
    corp.email = Some("buyer@bigcorp.com".to_string());
    let mut personal = fixtures::contact(ctx.scope.org_id, None);
    personal.email = Some("someone@gmail.com".to_string());
    ctx.store.insert_contact(corp.clone()).await.unwrap();
    ctx.store.insert_contact(personal).await.unwrap();

    let rules = vec![SegmentRule::new(
        ctx.scope.org_id,
        "email",
        "CONTAINS",
        "bigcorp",
    )];

    let service = DripCampaignService::new(ctx.store.clone(), ctx.notifier.clone());
    let matched = service.contacts_matching(&ctx.scope, &rules).await.unwrap();

    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].contact_id, corp.contact_id);
}
