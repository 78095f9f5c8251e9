use crate::domain::program::Program;
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// One ledger summarized as a flat CSV row.
#[derive(Debug, Serialize)]
struct StatementRow {
    program: String,
    learner: String,
    schedule: String,
    status: String,
    total: Decimal,
    paid: Decimal,
    outstanding: Decimal,
    next_payment_date: Option<DateTime<Utc>>,
    completed: bool,
}

impl From<&Program> for StatementRow {
    fn from(program: &Program) -> Self {
        Self {
            program: program.program_name.clone(),
            learner: program.learner_email.clone(),
            schedule: program.schedule.to_string(),
            status: program.status.to_string(),
            total: program.total_amount.value(),
            paid: program.amount_paid.value(),
            outstanding: (program.total_amount - program.amount_paid)
                .value()
                .max(Decimal::ZERO),
            next_payment_date: program.next_payment_date,
            completed: program.is_completed(),
        }
    }
}

/// Writes program ledger summaries to a CSV sink.
pub struct StatementWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> StatementWriter<W> {
    /// Creates a new `StatementWriter` over any `Write` sink (e.g. File,
    /// Stdout).
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_programs(&mut self, programs: &[Program]) -> Result<()> {
        for program in programs {
            self.writer.serialize(StatementRow::from(program))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
