use crate::notify::kinds;
use crate::services::DealStageAutomationService;
use crate::tests::{fixtures, TestContext};

#[tokio::test]
async fn highest_priority_rule_wins() {
    let ctx = TestContext::new().await;
    let owner = fixtures::member(ctx.scope.org_id);
    let deal = fixtures::deal(ctx.scope.org_id, owner.member_id, "Qualification");
    ctx.store.insert_member(owner).await.unwrap();
    ctx.store.save_deal(deal.clone()).await.unwrap();

    let low = fixtures::stage_rule(ctx.scope.org_id, "Qualification", "Proposal", "EMAIL_OPENED", 5);
    let high =
        fixtures::stage_rule(ctx.scope.org_id, "Qualification", "Negotiation", "EMAIL_OPENED", 10);
    ctx.store.insert_deal_stage_rule(low).await.unwrap();
    ctx.store.insert_deal_stage_rule(high.clone()).await.unwrap();

    let service = DealStageAutomationService::new(ctx.store.clone(), ctx.notifier.clone());
    let applied = service
        .on_trigger(&ctx.scope, deal.deal_id, "EMAIL_OPENED")
        .await
        .unwrap()
        .expect("a rule should match");

    assert_eq!(applied.rule_id, high.rule_id);

    let deal = ctx
        .store
        .deal(ctx.scope.org_id, deal.deal_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deal.stage, "Negotiation");

    assert_eq!(ctx.notifications_of_kind(kinds::DEAL_STAGE_CHANGED).await.len(), 1);
    let activities = ctx.store.activities(ctx.scope.org_id).await.unwrap();
    assert!(activities
        .iter()
        .any(|a| a.kind == "DEAL_STAGE_CHANGED" && a.description.contains("Negotiation")));
}

#[tokio::test]
async fn no_matching_rule_leaves_deal_untouched() {
    let ctx = TestContext::new().await;
    let owner = fixtures::member(ctx.scope.org_id);
    let deal = fixtures::deal(ctx.scope.org_id, owner.member_id, "Prospecting");
    ctx.store.insert_member(owner).await.unwrap();
    ctx.store.save_deal(deal.clone()).await.unwrap();

    // Rule for a different source stage.
    let rule = fixtures::stage_rule(ctx.scope.org_id, "Qualification", "Proposal", "EMAIL_OPENED", 1);
    ctx.store.insert_deal_stage_rule(rule).await.unwrap();

    let service = DealStageAutomationService::new(ctx.store.clone(), ctx.notifier.clone());
    let applied = service
        .on_trigger(&ctx.scope, deal.deal_id, "EMAIL_OPENED")
        .await
        .unwrap();

    assert!(applied.is_none());
    let deal = ctx
        .store
        .deal(ctx.scope.org_id, deal.deal_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(deal.stage, "Prospecting");
    assert!(ctx
        .notifications_of_kind(kinds::DEAL_STAGE_CHANGED)
        .await
        .is_empty());
}

#[tokio::test]
async fn inactive_rules_are_ignored() {
    let ctx = TestContext::new().await;
    let owner = fixtures::member(ctx.scope.org_id);
    let deal = fixtures::deal(ctx.scope.org_id, owner.member_id, "Qualification");
    ctx.store.insert_member(owner).await.unwrap();
    ctx.store.save_deal(deal.clone()).await.unwrap();

    let mut rule =
        fixtures::stage_rule(ctx.scope.org_id, "Qualification", "Proposal", "EMAIL_OPENED", 5);
    rule.is_active = false;
    ctx.store.insert_deal_stage_rule(rule).await.unwrap();

    let service = DealStageAutomationService::new(ctx.store.clone(), ctx.notifier.clone());
    let applied = service
        .on_trigger(&ctx.scope, deal.deal_id, "EMAIL_OPENED")
        .await
        .unwrap();
    assert!(applied.is_none());
}

#[tokio::test]
async fn follow_up_trigger_notifies_owner() {
    use crate::tenant::{Role, TenantScope};

    let ctx = TestContext::new().await;
    let owner = fixtures::member(ctx.scope.org_id);
    let deal = fixtures::deal(ctx.scope.org_id, owner.member_id, "Negotiation");
    ctx.store.insert_member(owner.clone()).await.unwrap();
    ctx.store.save_deal(deal.clone()).await.unwrap();

    // Member-scoped calls behave the same as system scans.
    let scope = TenantScope::new(ctx.scope.org_id, owner.member_id, Role::Agent);
    let service = DealStageAutomationService::new(ctx.store.clone(), ctx.notifier.clone());
    service
        .trigger_deal_follow_up(&scope, deal.deal_id)
        .await
        .unwrap();

    let sent = ctx.notifications_of_kind(kinds::DEAL_FOLLOW_UP).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].member_id, owner.member_id);
}
