use std::{sync::Arc, time::Duration};

use sea_orm::TransactionTrait;

use engine::{Engine, EngineError, ExpenseCmd, SettleCmd};

mod common;

use common::{RecordingNotifier, engine_from, engine_with_db, fund, money};

#[tokio::test]
async fn balances_aggregate_per_counterparty() {
    let (engine, _db, seed) = engine_with_db().await;
    fund(&engine, seed.bob, "fund-bob", "100.00").await;

    engine
        .create_expense(ExpenseCmd::new(seed.group, seed.alice, money("90.00")))
        .await
        .unwrap();
    engine
        .create_expense(ExpenseCmd::new(seed.group, seed.alice, money("30.00")))
        .await
        .unwrap();
    let carols = engine
        .create_expense(ExpenseCmd::new(seed.group, seed.carol, money("15.00")))
        .await
        .unwrap();

    let bob_owes = engine.balances_owed(seed.bob).await.unwrap();
    assert_eq!(bob_owes.len(), 2);
    assert_eq!(bob_owes[0].user_id, seed.alice);
    assert_eq!(bob_owes[0].username, "alice");
    assert_eq!(bob_owes[0].total, money("40.00"));
    assert_eq!(bob_owes[1].user_id, seed.carol);
    assert_eq!(bob_owes[1].total, money("5.00"));

    let owed_to_alice = engine.balances_owed_to(seed.alice).await.unwrap();
    assert_eq!(owed_to_alice.len(), 2);
    assert!(owed_to_alice.iter().all(|b| b.total == money("40.00")));

    // Settling removes the debt from every view.
    let bob_to_carol = carols
        .splits
        .iter()
        .find(|s| s.owed_by == seed.bob)
        .unwrap()
        .id;
    engine
        .settle_split(SettleCmd::new(bob_to_carol, seed.bob, money("5.00")))
        .await
        .unwrap();
    let bob_owes = engine.balances_owed(seed.bob).await.unwrap();
    assert_eq!(bob_owes.len(), 1);
    assert!(engine.balances_owed_to(seed.carol).await.unwrap()[0].user_id == seed.alice);

    let summary = engine.group_summary(seed.group, seed.carol).await.unwrap();
    assert_eq!(summary.group_name, "Flat 4B");
    let bob = summary
        .debtors
        .iter()
        .find(|b| b.user_id == seed.bob)
        .unwrap();
    assert_eq!(bob.total, money("40.00"));
    let carol = summary
        .debtors
        .iter()
        .find(|b| b.user_id == seed.carol)
        .unwrap();
    assert_eq!(carol.total, money("40.00"));
    let alice = summary
        .debtors
        .iter()
        .find(|b| b.user_id == seed.alice)
        .unwrap();
    assert_eq!(alice.total, money("5.00"));
}

#[tokio::test]
async fn empty_balances_for_new_user() {
    let (engine, _db, seed) = engine_with_db().await;
    assert!(engine.balances_owed(seed.bob).await.unwrap().is_empty());
    assert!(engine.balances_owed_to(seed.bob).await.unwrap().is_empty());
    assert!(
        engine
            .group_summary(seed.group, seed.bob)
            .await
            .unwrap()
            .debtors
            .is_empty()
    );

    let outsider = common::create_user(&engine, "outsider").await;
    let err = engine
        .group_summary(seed.group, outsider)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn reminders_count_failed_deliveries() {
    let notifier = Arc::new(RecordingNotifier::failing_for(&["carol@example.com"]));
    let (engine, _db, seed) = engine_from(Engine::builder().notifier(notifier.clone())).await;

    let rent = engine
        .create_expense(ExpenseCmd::new(seed.group, seed.alice, money("100.00")).description("rent"))
        .await
        .unwrap();
    engine
        .create_expense(ExpenseCmd::new(seed.group, seed.bob, money("3.00")))
        .await
        .unwrap();

    let report = engine.send_debtor_reminders().await.unwrap();
    // rent: bob + carol; second expense: alice + carol.
    assert_eq!(report.attempted, 4);
    assert_eq!(report.failed, 2);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.abandoned, 0);

    let bob_subjects = notifier.subjects_for("bob@example.com");
    assert!(
        bob_subjects
            .iter()
            .any(|s| s == "Reminder: you still owe 33.33 for 'rent'")
    );
    assert!(notifier.subjects_for("carol@example.com").is_empty());

    // Fully settled debts are not reminded again.
    fund(&engine, seed.bob, "fund-bob", "50.00").await;
    let bob_split = rent
        .splits
        .iter()
        .find(|s| s.owed_by == seed.bob)
        .unwrap()
        .id;
    engine
        .settle_split(SettleCmd::new(bob_split, seed.bob, money("33.33")))
        .await
        .unwrap();
    let report = engine.send_debtor_reminders().await.unwrap();
    assert_eq!(report.attempted, 3);
}

#[tokio::test]
async fn reminder_deadline_reports_abandoned_sends() {
    let notifier = Arc::new(RecordingNotifier::stalling_for(&["carol@example.com"]));
    let (engine, _db, seed) = engine_from(Engine::builder().notifier(notifier.clone())).await;
    engine
        .create_expense(ExpenseCmd::new(seed.group, seed.alice, money("100.00")).description("rent"))
        .await
        .unwrap();

    let report = engine
        .send_debtor_reminders_within(Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(report.attempted, 2);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.abandoned, 1);
    assert_eq!(notifier.subjects_for("bob@example.com").len(), 1);
}

#[tokio::test]
async fn settlement_notifies_the_payer() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (engine, _db, seed) = engine_from(Engine::builder().notifier(notifier.clone())).await;
    fund(&engine, seed.bob, "fund-bob", "50.00").await;
    let detail = engine
        .create_expense(ExpenseCmd::new(seed.group, seed.alice, money("30.00")))
        .await
        .unwrap();
    let split_id = detail
        .splits
        .iter()
        .find(|s| s.owed_by == seed.bob)
        .unwrap()
        .id;
    engine
        .settle_split(SettleCmd::new(split_id, seed.bob, money("10.00")))
        .await
        .unwrap();

    let expected = format!("You've been paid for split #{split_id}");
    let mut delivered = false;
    for _ in 0..50 {
        if notifier.subjects_for("alice@example.com").contains(&expected) {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(delivered);
    engine.shutdown().await;
}

#[tokio::test]
async fn blocked_unit_of_work_times_out() {
    let (engine, db, seed) =
        engine_from(Engine::builder().operation_timeout(Duration::from_millis(50))).await;

    // Hold the only pooled connection so the next unit of work cannot start.
    let held = db.begin().await.unwrap();
    let err = engine.balances_owed(seed.bob).await.unwrap_err();
    assert!(matches!(err, EngineError::Timeout(_)));
    held.rollback().await.unwrap();

    assert!(engine.balances_owed(seed.bob).await.is_ok());
}

#[tokio::test]
async fn zero_timeout_is_rejected() {
    let err = Engine::builder()
        .database(common::memory_db().await)
        .operation_timeout(Duration::ZERO)
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
