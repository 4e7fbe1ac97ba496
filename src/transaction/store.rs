//! The client-side copy of the signed-in user's transactions.

use crate::{
    Error, UserID,
    transaction::{TransactionId, TransactionRecord},
};

/// Whether the store holds the user's transactions yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// No fetch has been attempted.
    NotLoaded,
    /// The last fetch succeeded.
    Loaded,
    /// The last fetch failed, the store is empty until the next attempt succeeds.
    Failed,
}

/// A copy of one user's transactions in the order the remote store returned them.
///
/// The store is only changed after the remote store has confirmed a change,
/// and only ever holds records owned by its user.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionStore {
    owner: UserID,
    records: Vec<TransactionRecord>,
    load_state: LoadState,
}

impl TransactionStore {
    /// Create an empty store for `owner`'s transactions.
    pub fn new(owner: UserID) -> Self {
        Self {
            owner,
            records: Vec::new(),
            load_state: LoadState::NotLoaded,
        }
    }

    /// The user whose transactions are stored.
    pub fn owner(&self) -> UserID {
        self.owner
    }

    /// The stored transactions, newest first.
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    /// Get the transaction with `id`.
    pub fn get(&self, id: TransactionId) -> Option<&TransactionRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Whether the store holds a transaction with `id`.
    pub fn contains(&self, id: TransactionId) -> bool {
        self.get(id).is_some()
    }

    /// The number of stored transactions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no stored transactions.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The outcome of the last fetch.
    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    /// Replace the contents with the result of a full fetch.
    ///
    /// Records owned by anyone else are dropped.
    pub fn populate(&mut self, records: Vec<TransactionRecord>) {
        let owner = self.owner;
        let fetched = records.len();

        self.records = records
            .into_iter()
            .filter(|record| record.owner_id == owner)
            .collect();

        if self.records.len() != fetched {
            tracing::warn!(
                "Dropped {} fetched transactions not owned by user {owner}",
                fetched - self.records.len()
            );
        }

        self.load_state = LoadState::Loaded;
    }

    /// Record that the full fetch failed, leaving the store empty.
    pub fn mark_load_failed(&mut self) {
        self.records.clear();
        self.load_state = LoadState::Failed;
    }

    /// Add a newly created transaction to the front.
    ///
    /// # Errors
    ///
    /// Returns [Error::ForeignRecord] if the record belongs to another user.
    pub fn prepend(&mut self, record: TransactionRecord) -> Result<(), Error> {
        self.check_owner(&record)?;
        self.records.insert(0, record);

        Ok(())
    }

    /// Replace the stored transaction that has the same ID as `record`, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::ForeignRecord] if the record belongs to another user,
    /// - [Error::UpdateMissingTransaction] if there is no transaction with the record's ID.
    pub fn replace(&mut self, record: TransactionRecord) -> Result<(), Error> {
        self.check_owner(&record)?;

        let existing = self
            .records
            .iter_mut()
            .find(|existing| existing.id == record.id)
            .ok_or(Error::UpdateMissingTransaction)?;
        *existing = record;

        Ok(())
    }

    /// Remove the transaction with `id`, returning it if it was stored.
    pub fn remove(&mut self, id: TransactionId) -> Option<TransactionRecord> {
        let index = self.records.iter().position(|record| record.id == id)?;

        Some(self.records.remove(index))
    }

    fn check_owner(&self, record: &TransactionRecord) -> Result<(), Error> {
        if record.owner_id == self.owner {
            Ok(())
        } else {
            tracing::warn!(
                "Refusing transaction {} owned by user {} in the store of user {}",
                record.id,
                record.owner_id,
                self.owner
            );
            Err(Error::ForeignRecord)
        }
    }
}
