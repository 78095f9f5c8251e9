use crate::domain::payment::PaymentRecord;
use crate::domain::ports::{PaymentStore, ProgramStore};
use crate::domain::program::{Program, ProgramId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for program ledgers.
///
/// Uses `Arc<RwLock<HashMap<ProgramId, Program>>>` to allow shared concurrent
/// access. Ideal for testing or small datasets where persistence is not
/// required.
#[derive(Default, Clone)]
pub struct InMemoryProgramStore {
    programs: Arc<RwLock<HashMap<ProgramId, Program>>>,
}

impl InMemoryProgramStore {
    /// Creates a new, empty in-memory program store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgramStore for InMemoryProgramStore {
    async fn insert(&self, program: Program) -> Result<()> {
        let mut programs = self.programs.write().await;
        if programs.contains_key(&program.id) {
            return Err(LedgerError::Conflict(format!(
                "program {} already exists",
                program.id
            )));
        }
        programs.insert(program.id, program);
        Ok(())
    }

    async fn get(&self, id: ProgramId) -> Result<Option<Program>> {
        let programs = self.programs.read().await;
        Ok(programs.get(&id).cloned())
    }

    async fn update(&self, program: Program) -> Result<()> {
        let mut programs = self.programs.write().await;
        if !programs.contains_key(&program.id) {
            return Err(LedgerError::NotFound(format!("program {}", program.id)));
        }
        programs.insert(program.id, program);
        Ok(())
    }

    async fn remove(&self, id: ProgramId) -> Result<Option<Program>> {
        let mut programs = self.programs.write().await;
        Ok(programs.remove(&id))
    }

    async fn all(&self) -> Result<Vec<Program>> {
        let programs = self.programs.read().await;
        Ok(programs.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for the payment audit trail.
///
/// Keyed by the external reference, which makes the uniqueness guarantee a
/// plain map check under the write lock.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<String, PaymentRecord>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, record: PaymentRecord) -> Result<()> {
        let mut payments = self.payments.write().await;
        if payments.contains_key(&record.reference) {
            return Err(LedgerError::DuplicateReference(record.reference.clone()));
        }
        payments.insert(record.reference.clone(), record);
        Ok(())
    }

    async fn reference_exists(&self, reference: &str) -> Result<bool> {
        let payments = self.payments.read().await;
        Ok(payments.contains_key(reference))
    }

    async fn all(&self) -> Result<Vec<PaymentRecord>> {
        let payments = self.payments.read().await;
        let mut records: Vec<PaymentRecord> = payments.values().cloned().collect();
        records.sort_by_key(|r| r.paid_at);
        Ok(records)
    }
}
