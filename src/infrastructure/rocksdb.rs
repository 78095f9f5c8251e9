use crate::domain::payment::PaymentRecord;
use crate::domain::ports::{PaymentStore, ProgramStore};
use crate::domain::program::{Program, ProgramId};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing program ledgers.
pub const CF_PROGRAMS: &str = "programs";
/// Column Family for the payment audit trail, keyed by external reference.
pub const CF_PAYMENTS: &str = "payments";

/// A persistent store implementation using RocksDB.
///
/// Handles storage for both `Program` and `PaymentRecord` entities using
/// separate Column Families. Payment records are keyed by their external
/// reference, so duplicate detection is a single point lookup.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("programs" and "payments")
    /// exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_programs = ColumnFamilyDescriptor::new(CF_PROGRAMS, Options::default());
        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_programs, cf_payments])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::Io(std::io::Error::other(format!(
                "{name} column family not found"
            )))
        })
    }

    fn put_program(&self, program: &Program) -> Result<()> {
        let cf = self.cf_handle(CF_PROGRAMS)?;
        let value = serde_json::to_vec(program)?;
        self.db.put_cf(cf, program.id.as_bytes(), value)?;
        Ok(())
    }
}

#[async_trait]
impl ProgramStore for RocksDbStore {
    async fn insert(&self, program: Program) -> Result<()> {
        let cf = self.cf_handle(CF_PROGRAMS)?;
        if self.db.get_pinned_cf(cf, program.id.as_bytes())?.is_some() {
            return Err(LedgerError::Conflict(format!(
                "program {} already exists",
                program.id
            )));
        }
        self.put_program(&program)
    }

    async fn get(&self, id: ProgramId) -> Result<Option<Program>> {
        let cf = self.cf_handle(CF_PROGRAMS)?;
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, program: Program) -> Result<()> {
        let cf = self.cf_handle(CF_PROGRAMS)?;
        if self.db.get_pinned_cf(cf, program.id.as_bytes())?.is_none() {
            return Err(LedgerError::NotFound(format!("program {}", program.id)));
        }
        self.put_program(&program)
    }

    async fn remove(&self, id: ProgramId) -> Result<Option<Program>> {
        let cf = self.cf_handle(CF_PROGRAMS)?;
        let existing = match self.db.get_cf(cf, id.as_bytes())? {
            Some(bytes) => Some(serde_json::from_slice(&bytes)?),
            None => None,
        };
        if existing.is_some() {
            self.db.delete_cf(cf, id.as_bytes())?;
        }
        Ok(existing)
    }

    async fn all(&self) -> Result<Vec<Program>> {
        let cf = self.cf_handle(CF_PROGRAMS)?;
        let mut programs = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            programs.push(serde_json::from_slice(&value)?);
        }
        Ok(programs)
    }
}

#[async_trait]
impl PaymentStore for RocksDbStore {
    async fn insert(&self, record: PaymentRecord) -> Result<()> {
        let cf = self.cf_handle(CF_PAYMENTS)?;
        let key = record.reference.as_bytes();
        if self.db.get_pinned_cf(cf, key)?.is_some() {
            return Err(LedgerError::DuplicateReference(record.reference.clone()));
        }
        let value = serde_json::to_vec(&record)?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }

    async fn reference_exists(&self, reference: &str) -> Result<bool> {
        let cf = self.cf_handle(CF_PAYMENTS)?;
        // Just check if the key exists without retrieving the value
        Ok(self.db.get_pinned_cf(cf, reference.as_bytes())?.is_some())
    }

    async fn all(&self) -> Result<Vec<PaymentRecord>> {
        let cf = self.cf_handle(CF_PAYMENTS)?;
        let mut records: Vec<PaymentRecord> = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        records.sort_by_key(|r| r.paid_at);
        Ok(records)
    }
}
