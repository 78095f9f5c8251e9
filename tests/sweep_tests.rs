mod common;

use async_trait::async_trait;
use common::{ADMIN, RecordingNotifier, StubGateway, date, harness, new_program, payment};
use eduledger::application::engine::ProgramEngine;
use eduledger::domain::notification::Notification;
use eduledger::domain::ports::NotificationSender;
use eduledger::domain::program::ProgramStatus;
use eduledger::domain::schedule::PaymentSchedule;
use eduledger::error::{LedgerError, Result};
use eduledger::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryProgramStore};
use eduledger::infrastructure::policy::StaticAdminPolicy;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_overdue_sweep_freezes_and_records_missed_date() {
    let h = harness();
    let program = h
        .engine
        .create_program(new_program(
            "Data Engineering",
            dec!(1000),
            6,
            PaymentSchedule::Monthly,
        ))
        .await
        .unwrap();
    h.engine.approve_program(program.id, ADMIN).await.unwrap();
    h.engine
        .reconcile_payment(payment(program.id, dec!(1000), "ref-1", date(2024, 1, 15)))
        .await
        .unwrap();

    let frozen = h.engine.sweep_overdue(date(2024, 3, 1)).await.unwrap();
    assert_eq!(frozen, 1);

    let ledger = h.engine.program(program.id).await.unwrap();
    assert_eq!(ledger.status, ProgramStatus::Frozen);
    assert_eq!(ledger.frozen_at, Some(date(2024, 3, 1)));
    assert_eq!(ledger.frozen_reason.as_deref(), Some("Missed payment deadline"));
    assert_eq!(ledger.last_missed_payment_date, Some(date(2024, 2, 15)));
    assert_eq!(h.notifier.count("program_frozen"), 1);
}

#[tokio::test]
async fn test_overdue_sweep_skips_ineligible_ledgers() {
    let h = harness();

    // Pending: never swept.
    let pending = h
        .engine
        .create_program(new_program("Pending", dec!(1000), 6, PaymentSchedule::Monthly))
        .await
        .unwrap();

    // Approved but never paid: reminded, not frozen.
    let unpaid = h
        .engine
        .create_program(new_program("Unpaid", dec!(1000), 6, PaymentSchedule::Monthly))
        .await
        .unwrap();
    h.engine.approve_program(unpaid.id, ADMIN).await.unwrap();

    // Paid and current: due date in the future.
    let current = h
        .engine
        .create_program(new_program("Current", dec!(1000), 6, PaymentSchedule::Monthly))
        .await
        .unwrap();
    h.engine.approve_program(current.id, ADMIN).await.unwrap();
    h.engine
        .reconcile_payment(payment(current.id, dec!(1000), "ref-c", date(2024, 2, 25)))
        .await
        .unwrap();

    // Completed: never frozen even with an old ledger.
    let done = h
        .engine
        .create_program(new_program("Done", dec!(1000), 1, PaymentSchedule::Monthly))
        .await
        .unwrap();
    h.engine.approve_program(done.id, ADMIN).await.unwrap();
    h.engine
        .reconcile_payment(payment(done.id, dec!(1000), "ref-d", date(2024, 1, 10)))
        .await
        .unwrap();

    assert_eq!(h.engine.sweep_overdue(date(2024, 3, 1)).await.unwrap(), 0);
    for id in [pending.id, unpaid.id, current.id, done.id] {
        assert_ne!(
            h.engine.program(id).await.unwrap().status,
            ProgramStatus::Frozen
        );
    }
}

#[tokio::test]
async fn test_second_sweep_is_idempotent() {
    let h = harness();
    let program = h
        .engine
        .create_program(new_program(
            "Data Engineering",
            dec!(1000),
            6,
            PaymentSchedule::Monthly,
        ))
        .await
        .unwrap();
    h.engine.approve_program(program.id, ADMIN).await.unwrap();
    h.engine
        .reconcile_payment(payment(program.id, dec!(1000), "ref-1", date(2024, 1, 15)))
        .await
        .unwrap();

    assert_eq!(h.engine.sweep_overdue(date(2024, 3, 1)).await.unwrap(), 1);
    assert_eq!(h.engine.sweep_overdue(date(2024, 3, 2)).await.unwrap(), 0);

    let ledger = h.engine.program(program.id).await.unwrap();
    assert_eq!(ledger.frozen_at, Some(date(2024, 3, 1)));
    assert_eq!(h.notifier.count("program_frozen"), 1);
}

#[tokio::test]
async fn test_reminder_sweep_includes_frozen_programs() {
    let h = harness();
    let program = h
        .engine
        .create_program(new_program(
            "Data Engineering",
            dec!(1000),
            6,
            PaymentSchedule::Monthly,
        ))
        .await
        .unwrap();
    h.engine.approve_program(program.id, ADMIN).await.unwrap();
    h.engine
        .reconcile_payment(payment(program.id, dec!(1000), "ref-1", date(2024, 1, 15)))
        .await
        .unwrap();
    h.engine.sweep_overdue(date(2024, 3, 1)).await.unwrap();

    // Frozen programs still get payment reminders; paying is how they thaw.
    let sent = h.engine.sweep_reminders(date(2024, 3, 1)).await.unwrap();
    assert_eq!(sent, 1);
    assert_eq!(h.notifier.count("payment_reminder"), 1);
}

/// Notifier that fails for one specific recipient.
#[derive(Clone)]
struct FlakyNotifier {
    inner: RecordingNotifier,
    failing_email: String,
}

#[async_trait]
impl NotificationSender for FlakyNotifier {
    async fn send(&self, notification: Notification) -> Result<()> {
        if let Notification::PaymentReminder { email, .. } = &notification
            && *email == self.failing_email
        {
            return Err(LedgerError::Upstream("mailbox unavailable".to_string()));
        }
        self.inner.send(notification).await
    }
}

#[tokio::test]
async fn test_reminder_sweep_tolerates_single_failure() {
    let recording = RecordingNotifier::default();
    let notifier = FlakyNotifier {
        inner: recording.clone(),
        failing_email: "broken@example.com".to_string(),
    };
    let engine = ProgramEngine::new(
        Box::new(InMemoryProgramStore::new()),
        Box::new(InMemoryPaymentStore::new()),
        Box::new(StubGateway::default()),
        Box::new(notifier),
        Box::new(StaticAdminPolicy::new([ADMIN.to_string()])),
    );

    let mut broken = new_program("Broken Mailbox", dec!(1000), 6, PaymentSchedule::Monthly);
    broken.learner_id = "learner-2".to_string();
    broken.learner_email = "broken@example.com".to_string();
    let broken = engine.create_program(broken).await.unwrap();
    let healthy = engine
        .create_program(new_program(
            "Healthy",
            dec!(1000),
            6,
            PaymentSchedule::Monthly,
        ))
        .await
        .unwrap();

    for (id, reference) in [(broken.id, "ref-b"), (healthy.id, "ref-h")] {
        engine.approve_program(id, ADMIN).await.unwrap();
        engine
            .reconcile_payment(payment(id, dec!(1000), reference, date(2024, 1, 15)))
            .await
            .unwrap();
    }

    // One delivery fails; the sweep still completes and counts the other.
    let sent = engine.sweep_reminders(date(2024, 3, 1)).await.unwrap();
    assert_eq!(sent, 1);
    assert_eq!(recording.count("payment_reminder"), 1);
}

#[tokio::test]
async fn test_admin_single_reminder_propagates_delivery_failure() {
    let recording = RecordingNotifier::default();
    let notifier = FlakyNotifier {
        inner: recording.clone(),
        failing_email: "learner@example.com".to_string(),
    };
    let engine = ProgramEngine::new(
        Box::new(InMemoryProgramStore::new()),
        Box::new(InMemoryPaymentStore::new()),
        Box::new(StubGateway::default()),
        Box::new(notifier),
        Box::new(StaticAdminPolicy::new([ADMIN.to_string()])),
    );
    let program = engine
        .create_program(new_program(
            "Data Engineering",
            dec!(1000),
            6,
            PaymentSchedule::Monthly,
        ))
        .await
        .unwrap();

    let result = engine.send_reminder(program.id, ADMIN).await;
    assert!(matches!(result, Err(LedgerError::Upstream(_))));
}
