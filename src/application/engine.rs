use crate::domain::money::{Amount, Balance};
use crate::domain::notification::Notification;
use crate::domain::payment::{PaymentEvent, PaymentRecord, PaymentStatus};
use crate::domain::ports::{
    AdminPolicyBox, ChargeInit, ChargeRequest, ChargeStatus, NotificationSender,
    NotificationSenderBox, PaymentGateway, PaymentGatewayBox, PaymentStore, PaymentStoreBox,
    ProgramStore, ProgramStoreBox,
};
use crate::domain::program::{Program, ProgramId, ProgramStatus};
use crate::domain::schedule::PaymentSchedule;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

/// Per-program serialization locks.
///
/// Every read-modify-write on a ledger runs under its program's lock so
/// concurrent reconciliation attempts cannot lose an `amount_paid`
/// increment. Reference uniqueness in the audit store is the second guard.
#[derive(Default)]
struct ProgramLocks {
    inner: Mutex<HashMap<ProgramId, Arc<Mutex<()>>>>,
}

impl ProgramLocks {
    async fn acquire(&self, id: ProgramId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Input for registering a new program.
#[derive(Debug, Clone)]
pub struct NewProgram {
    pub learner_id: String,
    pub learner_email: String,
    pub learner_name: String,
    pub program_name: String,
    pub cost_per_month: Decimal,
    pub duration_months: u32,
    pub schedule: PaymentSchedule,
}

/// Aggregate figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_programs: usize,
    pub active_programs: usize,
    pub total_learners: usize,
    pub total_revenue: Decimal,
}

/// The main entry point for the program payment lifecycle.
///
/// `ProgramEngine` owns the storage backends and external collaborators and
/// exposes the command surface: program registration, administrative
/// lifecycle transitions, payment initialization and reconciliation, and the
/// periodic sweeps.
pub struct ProgramEngine {
    programs: ProgramStoreBox,
    payments: PaymentStoreBox,
    gateway: PaymentGatewayBox,
    notifier: NotificationSenderBox,
    admins: AdminPolicyBox,
    locks: ProgramLocks,
}

impl ProgramEngine {
    pub fn new(
        programs: ProgramStoreBox,
        payments: PaymentStoreBox,
        gateway: PaymentGatewayBox,
        notifier: NotificationSenderBox,
        admins: AdminPolicyBox,
    ) -> Self {
        Self {
            programs,
            payments,
            gateway,
            notifier,
            admins,
            locks: ProgramLocks::default(),
        }
    }

    /// Registers a program. It starts `Pending` until an administrator
    /// approves it.
    pub async fn create_program(&self, request: NewProgram) -> Result<Program> {
        let cost = Amount::new(request.cost_per_month)?;
        let first_for_learner = self
            .programs_for_learner(&request.learner_id)
            .await?
            .is_empty();
        let program = Program::new(
            &request.learner_id,
            &request.learner_email,
            &request.learner_name,
            &request.program_name,
            cost,
            request.duration_months,
            request.schedule,
            Utc::now(),
        )?;
        self.programs.insert(program.clone()).await?;
        info!(program_id = %program.id, learner = %program.learner_id, "program registered");

        if first_for_learner {
            self.notify(Notification::Welcome {
                email: program.learner_email.clone(),
                name: program.learner_name.clone(),
            })
            .await;
        }
        self.notify(Notification::NewProgram {
            learner_name: program.learner_name.clone(),
            learner_email: program.learner_email.clone(),
            program_name: program.program_name.clone(),
        })
        .await;
        Ok(program)
    }

    /// Approves a pending program and tells the learner the first
    /// installment amount. The due date stays unset until the first payment.
    pub async fn approve_program(&self, id: ProgramId, approver: &str) -> Result<Program> {
        self.require_admin(approver)?;
        let _guard = self.locks.acquire(id).await;
        let mut program = self.load(id).await?;
        program.approve(approver, Utc::now())?;
        self.programs.update(program.clone()).await?;
        info!(program_id = %id, approver, "program approved");

        self.notify(Notification::ProgramApproved {
            email: program.learner_email.clone(),
            name: program.learner_name.clone(),
            program_name: program.program_name.clone(),
            first_installment: program.installment_amount().value(),
        })
        .await;
        Ok(program)
    }

    /// Revokes a program. Terminal for payment purposes; the ledger stays
    /// queryable.
    pub async fn revoke_program(&self, id: ProgramId, actor: &str) -> Result<Program> {
        self.require_admin(actor)?;
        let _guard = self.locks.acquire(id).await;
        let mut program = self.load(id).await?;
        program.revoke()?;
        self.programs.update(program.clone()).await?;
        info!(program_id = %id, actor, "program revoked");
        Ok(program)
    }

    /// Permanently removes a ledger. Legal from any status at this level;
    /// callers may restrict further. Audit payment records survive.
    pub async fn delete_program(&self, id: ProgramId, actor: &str) -> Result<Program> {
        self.require_admin(actor)?;
        let _guard = self.locks.acquire(id).await;
        let program = self
            .programs
            .remove(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("program {id}")))?;
        info!(program_id = %id, actor, "program deleted");

        self.notify(Notification::ProgramDeleted {
            learner_name: program.learner_name.clone(),
            learner_email: program.learner_email.clone(),
            program_name: program.program_name.clone(),
            reason: format!("program permanently deleted by {actor}"),
        })
        .await;
        Ok(program)
    }

    /// Sets up a gateway charge for the installment currently due.
    ///
    /// Frozen programs may initialize a charge: the resulting payment is the
    /// only path that unfreezes them.
    pub async fn initialize_payment(&self, id: ProgramId, learner_id: &str) -> Result<ChargeInit> {
        let program = self.load(id).await?;
        if program.learner_id != learner_id {
            return Err(LedgerError::NotFound(format!("program {id}")));
        }
        match program.status {
            ProgramStatus::Pending => {
                return Err(LedgerError::InvalidState(
                    "program must be approved before payments can be made".to_string(),
                ));
            }
            ProgramStatus::Revoked => {
                return Err(LedgerError::InvalidState(
                    "program has been revoked".to_string(),
                ));
            }
            ProgramStatus::Approved | ProgramStatus::Frozen => {}
        }
        if program.is_completed() {
            return Err(LedgerError::InvalidState(
                "program is already completed".to_string(),
            ));
        }

        let due = Amount::new(program.amount_due_now().value())?;
        let reference = format!("{}_{}", id, Utc::now().timestamp_millis());
        let request = ChargeRequest {
            email: program.learner_email.clone(),
            amount_minor: due.to_minor_units()?,
            reference,
            program_id: id,
            learner_id: learner_id.to_string(),
        };
        let init = self.gateway.initialize_charge(request).await?;
        info!(program_id = %id, reference = %init.reference, "charge initialized");
        Ok(init)
    }

    /// Verifies a charge with the gateway and reconciles it on success.
    pub async fn verify_payment(&self, reference: &str) -> Result<Program> {
        let verification = self.gateway.verify_charge(reference).await?;
        if verification.status != ChargeStatus::Success {
            return Err(LedgerError::Upstream(format!(
                "gateway reported charge {reference} as {:?}",
                verification.status
            )));
        }
        let event = PaymentEvent {
            program_id: verification.program_id,
            amount: Amount::from_minor_units(verification.amount_minor)?,
            reference: reference.to_string(),
            paid_at: verification.paid_at,
        };
        self.reconcile_payment(event).await
    }

    /// Applies a gateway-verified payment to its ledger.
    ///
    /// At-most-once per reference: the audit store insert reserves the
    /// reference before the ledger update, and the ledger history check
    /// covers references applied before the audit trail existed. The whole
    /// ledger record persists in one put under the program lock.
    pub async fn reconcile_payment(&self, event: PaymentEvent) -> Result<Program> {
        let _guard = self.locks.acquire(event.program_id).await;
        if self.payments.reference_exists(&event.reference).await? {
            return Err(LedgerError::DuplicateReference(event.reference.clone()));
        }
        let mut program = self.load(event.program_id).await?;
        program.apply_payment(event.amount, &event.reference, event.paid_at)?;

        let record = PaymentRecord::new(
            program.id,
            &program.learner_id,
            event.amount,
            &event.reference,
            event.paid_at,
        );
        self.payments.insert(record).await?;
        self.programs.update(program.clone()).await?;
        info!(
            program_id = %program.id,
            amount = %event.amount.value(),
            reference = %event.reference,
            completed = program.is_completed(),
            "payment reconciled"
        );

        self.notify(Notification::PaymentConfirmed {
            email: program.learner_email.clone(),
            name: program.learner_name.clone(),
            program_name: program.program_name.clone(),
            amount: event.amount.value(),
            reference: event.reference.clone(),
        })
        .await;
        self.notify(Notification::PaymentMade {
            learner_name: program.learner_name.clone(),
            learner_email: program.learner_email.clone(),
            program_name: program.program_name.clone(),
            amount: event.amount.value(),
            reference: event.reference.clone(),
        })
        .await;
        Ok(program)
    }

    /// Freezes approved programs that missed their payment deadline.
    ///
    /// Returns the number frozen this run. One ledger's failure never aborts
    /// the rest; already-frozen programs are not reselected, so repeated
    /// sweeps are idempotent.
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut frozen = 0;
        for candidate in self.programs.all().await? {
            if candidate.status != ProgramStatus::Approved
                || candidate.amount_paid <= Balance::ZERO
                || candidate.is_completed()
            {
                continue;
            }
            let Some(due) = candidate.next_payment_date else {
                continue;
            };
            if due >= now {
                continue;
            }
            match self.freeze_program(candidate.id, now).await {
                Ok(program) => {
                    frozen += 1;
                    self.notify(Notification::ProgramFrozen {
                        learner_name: program.learner_name.clone(),
                        learner_email: program.learner_email.clone(),
                        program_name: program.program_name.clone(),
                        missed_payment_date: due,
                    })
                    .await;
                }
                Err(error) => {
                    warn!(program_id = %candidate.id, %error, "freeze skipped");
                }
            }
        }
        info!(frozen, "overdue sweep finished");
        Ok(frozen)
    }

    /// Requests a reminder for every incomplete program whose due date has
    /// arrived, regardless of freeze eligibility. Returns the number of
    /// reminders dispatched; per-ledger delivery failures are logged and
    /// skipped.
    pub async fn sweep_reminders(&self, today: DateTime<Utc>) -> Result<usize> {
        let mut sent = 0;
        for program in self.programs.all().await? {
            if program.is_completed() || program.schedule == PaymentSchedule::Once {
                continue;
            }
            let Some(due) = program.next_payment_date else {
                continue;
            };
            if due > today {
                continue;
            }
            let reminder = Notification::PaymentReminder {
                email: program.learner_email.clone(),
                program_name: program.program_name.clone(),
                amount_due: program.amount_due_now().value(),
                due_date: program.next_payment_date,
            };
            match self.notifier.send(reminder).await {
                Ok(()) => sent += 1,
                Err(error) => {
                    warn!(program_id = %program.id, %error, "reminder delivery failed");
                }
            }
        }
        info!(sent, "reminder sweep finished");
        Ok(sent)
    }

    /// Sends a single reminder on an administrator's request.
    ///
    /// Unlike ambient notifications, delivery failure here is the result of
    /// the operation and is surfaced to the caller.
    pub async fn send_reminder(&self, id: ProgramId, actor: &str) -> Result<()> {
        self.require_admin(actor)?;
        let program = self.load(id).await?;
        if program.is_completed() {
            return Err(LedgerError::InvalidState(
                "program is already completed".to_string(),
            ));
        }
        let reminder = Notification::PaymentReminder {
            email: program.learner_email.clone(),
            program_name: program.program_name.clone(),
            amount_due: program.amount_due_now().value(),
            due_date: program.next_payment_date,
        };
        self.notifier
            .send(reminder)
            .await
            .map_err(|e| LedgerError::Upstream(format!("failed to deliver reminder: {e}")))
    }

    /// Aggregate dashboard figures.
    pub async fn stats(&self, actor: &str) -> Result<Stats> {
        self.require_admin(actor)?;
        let programs = self.programs.all().await?;
        let payments = self.payments.all().await?;

        let learners: HashSet<&str> = programs.iter().map(|p| p.learner_id.as_str()).collect();
        let total_revenue = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Success)
            .map(|p| p.amount)
            .sum();

        Ok(Stats {
            total_programs: programs.len(),
            active_programs: programs.iter().filter(|p| !p.is_completed()).count(),
            total_learners: learners.len(),
            total_revenue,
        })
    }

    pub async fn program(&self, id: ProgramId) -> Result<Program> {
        self.load(id).await
    }

    pub async fn programs_for_learner(&self, learner_id: &str) -> Result<Vec<Program>> {
        let mut programs: Vec<Program> = self
            .programs
            .all()
            .await?
            .into_iter()
            .filter(|p| p.learner_id == learner_id)
            .collect();
        programs.sort_by_key(|p| p.created_at);
        Ok(programs)
    }

    pub async fn programs_by_status(
        &self,
        actor: &str,
        status: Option<ProgramStatus>,
    ) -> Result<Vec<Program>> {
        self.require_admin(actor)?;
        let mut programs: Vec<Program> = self
            .programs
            .all()
            .await?
            .into_iter()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .collect();
        programs.sort_by_key(|p| p.created_at);
        Ok(programs)
    }

    async fn freeze_program(&self, id: ProgramId, now: DateTime<Utc>) -> Result<Program> {
        let _guard = self.locks.acquire(id).await;
        // Reload under the lock: the ledger may have changed since the scan.
        let mut program = self.load(id).await?;
        program.freeze("Missed payment deadline", now)?;
        self.programs.update(program.clone()).await?;
        Ok(program)
    }

    async fn load(&self, id: ProgramId) -> Result<Program> {
        self.programs
            .get(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("program {id}")))
    }

    fn require_admin(&self, identity: &str) -> Result<()> {
        if self.admins.is_admin(identity) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized(format!(
                "{identity} is not an administrator"
            )))
        }
    }

    async fn notify(&self, notification: Notification) {
        let event = notification.event_name();
        if let Err(error) = self.notifier.send(notification).await {
            warn!(event, %error, "notification delivery failed");
        }
    }
}
