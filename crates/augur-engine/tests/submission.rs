//! Submission flow: funding decisions, rollback and cancellation.

mod common;

use std::sync::Arc;

use augur_core::{ActionStatus, ActionType, BillingError, FundingMode, UserId};
use augur_store::Store;

use common::{engine, engine_with, engine_with_queue, FaultyStore, COST};

#[tokio::test]
async fn paid_when_no_free_tier() {
    let mut t = engine(100, Some(0));
    let user = UserId::generate();

    let submission = t
        .engine
        .submit_action(&user, ActionType::fortune())
        .await
        .unwrap();

    assert_eq!(submission.funding_mode, FundingMode::Paid);
    assert_eq!(submission.cost, COST);
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 50);

    let event = t.events.recv().await.unwrap();
    assert_eq!(event.action_id, submission.action_id);
    assert_eq!(event.user_id, user);

    let record = t.engine.orchestrator().action(&submission.action_id).unwrap();
    assert_eq!(record.status, ActionStatus::Pending);
    assert_eq!(record.cost, COST);
}

#[tokio::test]
async fn free_slot_leaves_balance_untouched() {
    let t = engine(10, Some(1));
    let user = UserId::generate();

    let submission = t
        .engine
        .submit_action(&user, ActionType::fortune())
        .await
        .unwrap();

    assert_eq!(submission.funding_mode, FundingMode::Free);
    assert_eq!(submission.cost, 0);
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 10);

    let today = t.engine.clock().today();
    let usage = t.engine.quota().usage(&user, today).unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].action_id, submission.action_id);
}

#[tokio::test]
async fn denied_when_quota_used_and_balance_short() {
    let t = engine(10, Some(1));
    let user = UserId::generate();
    t.engine
        .submit_action(&user, ActionType::fortune())
        .await
        .unwrap();

    let err = t
        .engine
        .submit_action(&user, ActionType::fortune())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BillingError::InsufficientCredits {
            balance: 10,
            required: COST
        }
    ));
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 10);
}

#[tokio::test]
async fn unpriced_action_is_waived() {
    let t = engine(0, None);
    let user = UserId::generate();

    let submission = t
        .engine
        .submit_action(&user, "palm_reading".parse().unwrap())
        .await
        .unwrap();

    assert_eq!(submission.funding_mode, FundingMode::Waived);
    assert_eq!(submission.cost, 0);
}

#[tokio::test]
async fn quota_resets_next_day() {
    let t = engine(0, Some(1));
    let user = UserId::generate();
    let fortune = ActionType::fortune;

    t.engine.submit_action(&user, fortune()).await.unwrap();
    assert!(t.engine.submit_action(&user, fortune()).await.is_err());

    t.clock.advance(chrono::Duration::days(1));
    let submission = t.engine.submit_action(&user, fortune()).await.unwrap();
    assert_eq!(submission.funding_mode, FundingMode::Free);
}

#[tokio::test]
async fn failed_creation_reverses_debit() {
    let store = Arc::new(FaultyStore::new());
    let t = engine_with(Arc::clone(&store) as Arc<dyn Store>, 100, None);
    let user = UserId::generate();
    let before = t.engine.get_balance(&user).await.unwrap();

    FaultyStore::set(&store.fail_create_action, true);
    let err = t
        .engine
        .submit_action(&user, ActionType::fortune())
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::ActionCreationFailed(_)));
    assert_eq!(t.engine.get_balance(&user).await.unwrap(), before);

    let history = t.engine.ledger().history(&user, 10, 0).unwrap();
    assert_eq!(history[0].kind, augur_core::EntryKind::Reversal);
    assert_eq!(history[1].kind, augur_core::EntryKind::Debit);
}

#[tokio::test]
async fn failed_reversal_is_reported() {
    let store = Arc::new(FaultyStore::new());
    let t = engine_with(Arc::clone(&store) as Arc<dyn Store>, 100, None);
    let user = UserId::generate();

    FaultyStore::set(&store.fail_create_action, true);
    FaultyStore::set(&store.fail_reversal, true);
    let err = t
        .engine
        .submit_action(&user, ActionType::fortune())
        .await
        .unwrap_err();

    match err {
        BillingError::RollbackFailed {
            user_id, amount, ..
        } => {
            assert_eq!(user_id, user);
            assert_eq!(amount, COST);
        }
        other => panic!("expected RollbackFailed, got {other:?}"),
    }
    // The charge stays until someone reconciles it.
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 100 - COST);
}

#[tokio::test]
async fn failed_creation_keeps_consumed_free_slot() {
    let store = Arc::new(FaultyStore::new());
    let t = engine_with(Arc::clone(&store) as Arc<dyn Store>, 0, Some(1));
    let user = UserId::generate();

    FaultyStore::set(&store.fail_create_action, true);
    assert!(t
        .engine
        .submit_action(&user, ActionType::fortune())
        .await
        .is_err());

    assert_eq!(t.engine.remaining_free_uses_today(&user).await.unwrap(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn abandoned_submission_reverses_debit() {
    let store = Arc::new(FaultyStore::new());
    let t = engine_with(Arc::clone(&store) as Arc<dyn Store>, 100, None);
    let user = UserId::generate();
    t.engine.get_balance(&user).await.unwrap();

    FaultyStore::set(&store.panic_on_create_action, true);
    let engine = t.engine.clone();
    let joined =
        tokio::spawn(async move { engine.submit_action(&user, ActionType::fortune()).await })
            .await;

    assert!(joined.unwrap_err().is_panic());
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 100);
}

#[tokio::test]
async fn worker_reports_outcome_once() {
    let t = engine(100, None);
    let user = UserId::generate();
    let submission = t
        .engine
        .submit_action(&user, ActionType::fortune())
        .await
        .unwrap();
    let orchestrator = t.engine.orchestrator();

    let done = orchestrator
        .record_outcome(&submission.action_id, ActionStatus::Completed, None)
        .unwrap();
    assert_eq!(done.status, ActionStatus::Completed);

    assert!(matches!(
        orchestrator.record_outcome(&submission.action_id, ActionStatus::Failed, None),
        Err(BillingError::InvalidTransition(_))
    ));
    assert!(matches!(
        orchestrator.record_outcome(
            &augur_core::ActionId::generate(),
            ActionStatus::Completed,
            None
        ),
        Err(BillingError::ActionNotFound(_))
    ));
}

#[tokio::test]
async fn landed_record_is_marked_failed_on_rollback() {
    let store = Arc::new(FaultyStore::new());
    let t = engine_with(Arc::clone(&store) as Arc<dyn Store>, 100, None);
    let user = UserId::generate();

    FaultyStore::set(&store.lose_create_ack, true);
    let err = t
        .engine
        .submit_action(&user, ActionType::fortune())
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::ActionCreationFailed(_)));
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 100);
    assert!(t.engine.orchestrator().pending_actions(10).unwrap().is_empty());
}

#[tokio::test]
async fn unmarked_landed_record_stays_visible_for_reconciliation() {
    let store = Arc::new(FaultyStore::new());
    let t = engine_with(Arc::clone(&store) as Arc<dyn Store>, 100, None);
    let user = UserId::generate();

    FaultyStore::set(&store.lose_create_ack, true);
    FaultyStore::set(&store.fail_status_update, true);
    let err = t
        .engine
        .submit_action(&user, ActionType::fortune())
        .await
        .unwrap_err();

    assert!(matches!(err, BillingError::ActionCreationFailed(_)));
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 100);
    let pending = t.engine.orchestrator().pending_actions(10).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user_id, user);
}

#[tokio::test]
async fn full_queue_delays_but_never_drops_events() {
    let mut t = engine_with_queue(
        Arc::new(augur_store::MemoryStore::new()),
        100,
        None,
        1,
    );
    let user = UserId::generate();

    let submits: Vec<_> = (0..2)
        .map(|_| {
            let engine = t.engine.clone();
            tokio::spawn(async move { engine.submit_action(&user, ActionType::fortune()).await })
        })
        .collect();

    let first = t.events.recv().await.unwrap();
    let second = t.events.recv().await.unwrap();
    assert_ne!(first.action_id, second.action_id);

    for submit in submits {
        let submission = submit.await.unwrap().unwrap();
        assert!([first.action_id, second.action_id].contains(&submission.action_id));
    }
    assert_eq!(t.engine.get_balance(&user).await.unwrap().credits, 0);
}

#[tokio::test]
async fn unpublished_action_stays_pending_for_polling() {
    let t = engine(100, None);
    let user = UserId::generate();
    drop(t.events);

    let submission = t
        .engine
        .submit_action(&user, ActionType::fortune())
        .await
        .unwrap();

    let pending = t.engine.orchestrator().pending_actions(10).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, submission.action_id);
    assert_eq!(pending[0].cost, COST);
}
