use crate::domain::money::{Amount, Balance};
use crate::domain::payment::PaymentStatus;
use crate::domain::schedule::{self, PaymentSchedule};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a program ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ProgramId(pub Uuid);

impl ProgramId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ProgramId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| LedgerError::Validation(format!("invalid program id: {s}")))
    }
}

/// Lifecycle status of a program ledger.
///
/// `Frozen` is only reachable from `Approved` with at least one prior
/// payment; `Revoked` is terminal for payment purposes.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum ProgramStatus {
    Pending,
    Approved,
    Revoked,
    Frozen,
}

impl fmt::Display for ProgramStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProgramStatus::Pending => "pending",
            ProgramStatus::Approved => "approved",
            ProgramStatus::Revoked => "revoked",
            ProgramStatus::Frozen => "frozen",
        };
        f.write_str(s)
    }
}

/// One applied payment in a ledger's append-only history.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct HistoryEntry {
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    pub reference: String,
    pub status: PaymentStatus,
}

/// The ledger tracking financial state for one learner/program pair.
///
/// Mutation goes through the lifecycle methods (`approve`, `revoke`,
/// `freeze`) and `apply_payment`; they enforce the status state machine and
/// the financial invariants. Fields are public for persistence and
/// inspection, not as a mutation API.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Program {
    pub id: ProgramId,
    pub learner_id: String,
    pub learner_email: String,
    pub learner_name: String,
    pub program_name: String,
    /// Monthly cost in major currency units. Fixed at creation.
    pub cost_per_month: Amount,
    /// Duration in months. Fixed at creation.
    pub duration_months: u32,
    pub schedule: PaymentSchedule,
    /// `cost_per_month * duration_months`. Fixed at creation.
    pub total_amount: Balance,
    /// Monotonically non-decreasing; grows only via `apply_payment`.
    pub amount_paid: Balance,
    /// Absent until the first successful payment; absent forever for `Once`.
    pub next_payment_date: Option<DateTime<Utc>>,
    pub status: ProgramStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub frozen_at: Option<DateTime<Utc>>,
    pub frozen_reason: Option<String>,
    pub last_missed_payment_date: Option<DateTime<Utc>>,
    /// Append-only; never truncated.
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl Program {
    pub fn new(
        learner_id: &str,
        learner_email: &str,
        learner_name: &str,
        program_name: &str,
        cost_per_month: Amount,
        duration_months: u32,
        schedule: PaymentSchedule,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if program_name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "program name must not be empty".to_string(),
            ));
        }
        if duration_months == 0 {
            return Err(LedgerError::Validation(
                "duration must be at least one month".to_string(),
            ));
        }
        let total_amount =
            Balance::new(cost_per_month.value() * Decimal::from(duration_months));
        Ok(Self {
            id: ProgramId::new(),
            learner_id: learner_id.to_string(),
            learner_email: learner_email.to_string(),
            learner_name: learner_name.to_string(),
            program_name: program_name.to_string(),
            cost_per_month,
            duration_months,
            schedule,
            total_amount,
            amount_paid: Balance::ZERO,
            next_payment_date: None,
            status: ProgramStatus::Pending,
            approved_at: None,
            approved_by: None,
            frozen_at: None,
            frozen_reason: None,
            last_missed_payment_date: None,
            history: Vec::new(),
            created_at: now,
        })
    }

    /// A program is completed once payments reach the total. The comparison
    /// is `>=`: an overshooting final payment still completes.
    pub fn is_completed(&self) -> bool {
        self.amount_paid >= self.total_amount
    }

    /// The scheduled per-installment amount for this program.
    pub fn installment_amount(&self) -> Balance {
        schedule::installment_amount(
            self.cost_per_month.value(),
            self.schedule,
            self.duration_months,
        )
    }

    /// The amount owed right now, capped so the final installment never
    /// overshoots the total.
    pub fn amount_due_now(&self) -> Balance {
        schedule::amount_due_now(self.installment_amount(), self.total_amount, self.amount_paid)
    }

    /// Approves a pending program.
    ///
    /// Does not set `next_payment_date`; that is deferred until the first
    /// successful payment.
    pub fn approve(&mut self, approver: &str, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.status != ProgramStatus::Pending {
            return Err(LedgerError::Conflict(format!(
                "program is {}, only pending programs can be approved",
                self.status
            )));
        }
        self.status = ProgramStatus::Approved;
        self.approved_at = Some(now);
        self.approved_by = Some(approver.to_string());
        Ok(())
    }

    /// Revokes a program. Payments are blocked thereafter; history and
    /// financial fields are untouched.
    pub fn revoke(&mut self) -> Result<(), LedgerError> {
        match self.status {
            ProgramStatus::Pending | ProgramStatus::Approved | ProgramStatus::Frozen => {
                self.status = ProgramStatus::Revoked;
                Ok(())
            }
            ProgramStatus::Revoked => Err(LedgerError::Conflict(
                "program is already revoked".to_string(),
            )),
        }
    }

    /// Freezes an approved program that missed its payment deadline.
    ///
    /// Legal only from `Approved`, with at least one prior payment, a due
    /// date strictly in the past, and the program not completed. A program
    /// that never received its first payment is never frozen.
    pub fn freeze(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), LedgerError> {
        match self.status {
            ProgramStatus::Approved => {}
            ProgramStatus::Frozen => {
                return Err(LedgerError::Conflict(
                    "program is already frozen".to_string(),
                ));
            }
            other => {
                return Err(LedgerError::Conflict(format!(
                    "program is {other}, only approved programs can be frozen"
                )));
            }
        }
        if self.amount_paid <= Balance::ZERO {
            return Err(LedgerError::Conflict(
                "program has no payments yet and cannot be frozen".to_string(),
            ));
        }
        if self.is_completed() {
            return Err(LedgerError::Conflict(
                "completed programs cannot be frozen".to_string(),
            ));
        }
        let due = self.next_payment_date.ok_or_else(|| {
            LedgerError::Conflict("program has no payment deadline".to_string())
        })?;
        if due >= now {
            return Err(LedgerError::Conflict(
                "payment deadline has not passed".to_string(),
            ));
        }
        self.status = ProgramStatus::Frozen;
        self.frozen_at = Some(now);
        self.frozen_reason = Some(reason.to_string());
        self.last_missed_payment_date = Some(due);
        Ok(())
    }

    /// Applies a verified payment to the ledger.
    ///
    /// Rejects replayed references and payments against pending/revoked
    /// programs. A frozen program unfreezes, with the schedule clock reset
    /// from `paid_at` rather than the missed cadence anchor. Overshooting
    /// payments are recorded in full; completion clears the due date.
    pub fn apply_payment(
        &mut self,
        amount: Amount,
        reference: &str,
        paid_at: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        match self.status {
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
        if self.history.iter().any(|entry| entry.reference == reference) {
            return Err(LedgerError::DuplicateReference(reference.to_string()));
        }

        self.amount_paid += amount.into();
        self.history.push(HistoryEntry {
            amount: amount.value(),
            date: paid_at,
            reference: reference.to_string(),
            status: PaymentStatus::Success,
        });

        if self.status == ProgramStatus::Frozen {
            self.status = ProgramStatus::Approved;
            self.frozen_at = None;
            self.frozen_reason = None;
            self.last_missed_payment_date = None;
        }

        if self.is_completed() || self.schedule == PaymentSchedule::Once {
            self.next_payment_date = None;
        } else {
            self.next_payment_date = schedule::next_due_date(paid_at, self.schedule);
        }
        Ok(())
    }
}
