use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use eduledger::application::engine::{NewProgram, ProgramEngine};
use eduledger::domain::money::Amount;
use eduledger::domain::notification::Notification;
use eduledger::domain::payment::PaymentEvent;
use eduledger::domain::ports::{
    ChargeInit, ChargeRequest, ChargeVerification, NotificationSender, PaymentGateway,
};
use eduledger::domain::program::ProgramId;
use eduledger::domain::schedule::PaymentSchedule;
use eduledger::error::{LedgerError, Result};
use eduledger::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryProgramStore};
use eduledger::infrastructure::policy::StaticAdminPolicy;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

pub const ADMIN: &str = "admin@example.com";

pub fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

#[derive(Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, event_name: &str) -> usize {
        self.sent()
            .iter()
            .filter(|n| n.event_name() == event_name)
            .count()
    }
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct StubGateway {
    verification: Arc<Mutex<Option<ChargeVerification>>>,
}

impl StubGateway {
    pub fn set_verification(&self, verification: ChargeVerification) {
        *self.verification.lock().unwrap() = Some(verification);
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn initialize_charge(&self, request: ChargeRequest) -> Result<ChargeInit> {
        Ok(ChargeInit {
            authorization_url: format!("https://gateway.test/pay/{}", request.reference),
            access_code: "access".to_string(),
            reference: request.reference,
        })
    }

    async fn verify_charge(&self, reference: &str) -> Result<ChargeVerification> {
        self.verification
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| LedgerError::Upstream(format!("unknown charge {reference}")))
    }
}

pub struct Harness {
    pub engine: ProgramEngine,
    pub programs: InMemoryProgramStore,
    pub notifier: RecordingNotifier,
    pub gateway: StubGateway,
}

pub fn harness() -> Harness {
    let programs = InMemoryProgramStore::new();
    let notifier = RecordingNotifier::default();
    let gateway = StubGateway::default();
    let engine = ProgramEngine::new(
        Box::new(programs.clone()),
        Box::new(InMemoryPaymentStore::new()),
        Box::new(gateway.clone()),
        Box::new(notifier.clone()),
        Box::new(StaticAdminPolicy::new([ADMIN.to_string()])),
    );
    Harness {
        engine,
        programs,
        notifier,
        gateway,
    }
}

pub fn new_program(name: &str, cost: Decimal, months: u32, schedule: PaymentSchedule) -> NewProgram {
    NewProgram {
        learner_id: "learner-1".to_string(),
        learner_email: "learner@example.com".to_string(),
        learner_name: "Ada".to_string(),
        program_name: name.to_string(),
        cost_per_month: cost,
        duration_months: months,
        schedule,
    }
}

pub fn payment(
    id: ProgramId,
    amount: Decimal,
    reference: &str,
    paid_at: DateTime<Utc>,
) -> PaymentEvent {
    PaymentEvent {
        program_id: id,
        amount: Amount::new(amount).unwrap(),
        reference: reference.to_string(),
        paid_at,
    }
}
