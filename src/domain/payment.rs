use crate::domain::money::Amount;
use crate::domain::program::ProgramId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Settlement state of a single gateway transaction.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
    Pending,
}

/// Durable audit entry for one gateway transaction.
///
/// Owned independently of the program ledger so the payment trail survives
/// program mutation and deletion. The `reference` is the unique key that
/// prevents a verification callback from being applied twice.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub program_id: ProgramId,
    pub learner_id: String,
    pub amount: Decimal,
    pub reference: String,
    pub status: PaymentStatus,
    pub paid_at: DateTime<Utc>,
    pub method: String,
}

impl PaymentRecord {
    pub fn new(
        program_id: ProgramId,
        learner_id: &str,
        amount: Amount,
        reference: &str,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            program_id,
            learner_id: learner_id.to_string(),
            amount: amount.value(),
            reference: reference.to_string(),
            status: PaymentStatus::Success,
            paid_at,
            method: "paystack".to_string(),
        }
    }
}

/// A gateway-verified payment, ready for reconciliation against a ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentEvent {
    pub program_id: ProgramId,
    pub amount: Amount,
    pub reference: String,
    pub paid_at: DateTime<Utc>,
}
