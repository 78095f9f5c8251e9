//! Pure schedule and amount computations.
//!
//! All functions here are deterministic for identical inputs; they carry no
//! side effects and touch no clock of their own.

use crate::domain::money::{Balance, round2};
use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment cadence for a program. Determines installment size and due-date
/// stepping.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum PaymentSchedule {
    Daily,
    Weekly,
    Monthly,
    Once,
}

impl fmt::Display for PaymentSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentSchedule::Daily => "daily",
            PaymentSchedule::Weekly => "weekly",
            PaymentSchedule::Monthly => "monthly",
            PaymentSchedule::Once => "once",
        };
        f.write_str(s)
    }
}

/// Computes the per-installment amount for a schedule.
///
/// Weekly and daily installments assume a fixed 4 weeks / 30 days per month.
/// That approximation is intentional: installments stay constant across
/// calendar months rather than tracking exact month lengths.
pub fn installment_amount(
    cost_per_month: Decimal,
    schedule: PaymentSchedule,
    duration_months: u32,
) -> Balance {
    let amount = match schedule {
        PaymentSchedule::Monthly => cost_per_month,
        PaymentSchedule::Once => cost_per_month * Decimal::from(duration_months),
        PaymentSchedule::Weekly => round2(cost_per_month / Decimal::from(4)),
        PaymentSchedule::Daily => round2(cost_per_month / Decimal::from(30)),
    };
    Balance::new(amount)
}

/// Computes the next due date after a payment made at `from`.
///
/// Monthly stepping lands on the same day of month, clamped to the target
/// month's length (Jan 31 + 1 month = Feb 28/29). `Once` has no next due
/// date, ever.
pub fn next_due_date(from: DateTime<Utc>, schedule: PaymentSchedule) -> Option<DateTime<Utc>> {
    match schedule {
        PaymentSchedule::Daily => from.checked_add_signed(Duration::days(1)),
        PaymentSchedule::Weekly => from.checked_add_signed(Duration::days(7)),
        PaymentSchedule::Monthly => from.checked_add_months(Months::new(1)),
        PaymentSchedule::Once => None,
    }
}

/// Amount the learner owes right now: the scheduled installment, capped so
/// the final payment never overshoots the program total.
pub fn amount_due_now(installment: Balance, total: Balance, paid: Balance) -> Balance {
    let remaining = total - paid;
    let due = installment.value().min(remaining.value());
    Balance::new(due.max(Decimal::ZERO))
}
