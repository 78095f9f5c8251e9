use super::notification::Notification;
use super::payment::PaymentRecord;
use super::program::{Program, ProgramId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type ProgramStoreBox = Box<dyn ProgramStore>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type NotificationSenderBox = Box<dyn NotificationSender>;
pub type AdminPolicyBox = Box<dyn AdminPolicy>;

/// Persistence port for program ledgers.
///
/// `update` stores the whole record in one put; the engine relies on that
/// for atomic field updates. Sweep queries go through `all` and filter in
/// the engine.
#[async_trait]
pub trait ProgramStore: Send + Sync {
    async fn insert(&self, program: Program) -> Result<()>;
    async fn get(&self, id: ProgramId) -> Result<Option<Program>>;
    async fn update(&self, program: Program) -> Result<()>;
    async fn remove(&self, id: ProgramId) -> Result<Option<Program>>;
    async fn all(&self) -> Result<Vec<Program>>;
}

/// Append-only persistence port for the payment audit trail.
///
/// `insert` must reject an already-seen reference with
/// `DuplicateReferenceError`; that uniqueness is the primary concurrency
/// guard against replayed verification callbacks.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, record: PaymentRecord) -> Result<()>;
    async fn reference_exists(&self, reference: &str) -> Result<bool>;
    async fn all(&self) -> Result<Vec<PaymentRecord>>;
}

/// Charge initialization request handed to the gateway.
///
/// Amounts cross this boundary in the gateway's minor unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    pub email: String,
    pub amount_minor: i64,
    pub reference: String,
    pub program_id: ProgramId,
    pub learner_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeInit {
    pub authorization_url: String,
    pub access_code: String,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Success,
    Failed,
    Abandoned,
    Pending,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeVerification {
    pub status: ChargeStatus,
    pub amount_minor: i64,
    pub paid_at: DateTime<Utc>,
    pub program_id: ProgramId,
}

/// The third-party payment gateway, treated as a black box.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize_charge(&self, request: ChargeRequest) -> Result<ChargeInit>;
    async fn verify_charge(&self, reference: &str) -> Result<ChargeVerification>;
}

/// Fire-and-forget notification delivery.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<()>;
}

/// Authorization policy for administrative operations.
///
/// Passed into the engine explicitly instead of being derived from ambient
/// process state; the core only needs an opaque identity and this boolean.
pub trait AdminPolicy: Send + Sync {
    fn is_admin(&self, identity: &str) -> bool;
}
