use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Outbound notification events with flat data payloads.
///
/// Delivery is fire-and-forget: the engine logs failures and never lets
/// them fail a lifecycle transition or a reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    Welcome {
        email: String,
        name: String,
    },
    PaymentReminder {
        email: String,
        program_name: String,
        amount_due: Decimal,
        due_date: Option<DateTime<Utc>>,
    },
    PaymentConfirmed {
        email: String,
        name: String,
        program_name: String,
        amount: Decimal,
        reference: String,
    },
    ProgramApproved {
        email: String,
        name: String,
        program_name: String,
        first_installment: Decimal,
    },
    // Admin-facing variants
    NewProgram {
        learner_name: String,
        learner_email: String,
        program_name: String,
    },
    PaymentMade {
        learner_name: String,
        learner_email: String,
        program_name: String,
        amount: Decimal,
        reference: String,
    },
    ProgramFrozen {
        learner_name: String,
        learner_email: String,
        program_name: String,
        missed_payment_date: DateTime<Utc>,
    },
    ProgramDeleted {
        learner_name: String,
        learner_email: String,
        program_name: String,
        reason: String,
    },
}

impl Notification {
    pub fn event_name(&self) -> &'static str {
        match self {
            Notification::Welcome { .. } => "welcome",
            Notification::PaymentReminder { .. } => "payment_reminder",
            Notification::PaymentConfirmed { .. } => "payment_confirmed",
            Notification::ProgramApproved { .. } => "program_approved",
            Notification::NewProgram { .. } => "new_program",
            Notification::PaymentMade { .. } => "payment_made",
            Notification::ProgramFrozen { .. } => "program_frozen",
            Notification::ProgramDeleted { .. } => "program_deleted",
        }
    }
}
