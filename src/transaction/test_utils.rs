use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
};

use time::OffsetDateTime;

use crate::{
    Error, UserID,
    category::{Category, TransactionKind},
    money::Money,
    transaction::{
        NewTransaction, TransactionId, TransactionRecord, TransactionService, TransactionUpdate,
    },
};

/// An in-memory [TransactionService] that counts calls and can be told to fail.
#[derive(Debug, Default)]
pub(crate) struct FakeTransactionService {
    records: Mutex<Vec<TransactionRecord>>,
    last_id: AtomicI64,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl FakeTransactionService {
    /// A service that already holds `records`.
    pub(crate) fn with_records(records: Vec<TransactionRecord>) -> Self {
        let last_id = records.iter().map(|record| record.id).max().unwrap_or(0);

        Self {
            records: Mutex::new(records),
            last_id: AtomicI64::new(last_id),
            ..Default::default()
        }
    }

    /// How many times the service has been called.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every following call fail, or succeed again.
    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// A copy of the stored records.
    pub(crate) fn records(&self) -> Vec<TransactionRecord> {
        self.records.lock().unwrap().clone()
    }

    fn begin_call(&self) -> Result<(), Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            Err(Error::DatabaseLockError)
        } else {
            Ok(())
        }
    }
}

impl TransactionService for FakeTransactionService {
    async fn list(&self, owner: UserID) -> Result<Vec<TransactionRecord>, Error> {
        self.begin_call()?;

        let mut records: Vec<_> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|record| record.owner_id == owner)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

        Ok(records)
    }

    async fn create(&self, transaction: NewTransaction) -> Result<TransactionRecord, Error> {
        self.begin_call()?;

        let now = OffsetDateTime::now_utc();
        let record = TransactionRecord {
            id: self.last_id.fetch_add(1, Ordering::SeqCst) + 1,
            owner_id: transaction.owner_id,
            date: transaction.date,
            kind: transaction.kind,
            category: transaction.category,
            amount: transaction.amount,
            notes: transaction.notes,
            created_at: now,
            updated_at: now,
        };
        self.records.lock().unwrap().push(record.clone());

        Ok(record)
    }

    async fn update(
        &self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<TransactionRecord, Error> {
        self.begin_call()?;

        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(Error::UpdateMissingTransaction)?;

        record.date = update.date;
        record.kind = update.kind;
        record.category = update.category;
        record.amount = update.amount;
        record.notes = update.notes;
        record.updated_at = OffsetDateTime::now_utc();

        Ok(record.clone())
    }

    async fn delete(&self, id: TransactionId) -> Result<bool, Error> {
        self.begin_call()?;

        let mut records = self.records.lock().unwrap();
        let count = records.len();
        records.retain(|record| record.id != id);

        Ok(records.len() != count)
    }
}

/// A stored transaction with the given fields and default timestamps.
pub(crate) fn transaction_record(
    id: TransactionId,
    owner: UserID,
    date: time::Date,
    kind: TransactionKind,
    category: Category,
    minor_units: i64,
) -> TransactionRecord {
    TransactionRecord {
        id,
        owner_id: owner,
        date,
        kind,
        category,
        amount: Money::from_minor_units(minor_units),
        notes: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}
