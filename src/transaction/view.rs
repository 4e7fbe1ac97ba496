//! The transactions screen: the user's transactions, the active filter, the
//! totals and the one open form.

use serde::Serialize;
use time::Date;

use crate::{
    Error, UserID,
    transaction::{
        FormMode, LoadState, Totals, TransactionEditor, TransactionFilter, TransactionId,
        TransactionRecord, TransactionService, TransactionStore,
    },
};

/// Proof that the user confirmed deleting a transaction.
///
/// Only [TransactionsView::request_delete] hands these out, and only
/// [TransactionsView::confirm_delete] accepts them.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a delete only happens once the confirmation is passed to `confirm_delete`"]
pub struct DeleteConfirmation {
    id: TransactionId,
}

impl DeleteConfirmation {
    /// The transaction that will be deleted.
    pub fn transaction_id(&self) -> TransactionId {
        self.id
    }
}

/// What the client sees of the transactions screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionsSnapshot {
    /// The transactions that pass the filter, newest first.
    pub transactions: Vec<TransactionRecord>,
    /// The totals over `transactions`.
    pub totals: Totals,
    /// The number of transactions that pass the filter.
    pub count: usize,
    /// The message to show if the transactions could not be loaded.
    pub error: Option<String>,
}

/// The state behind the transactions screen for one signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionsView {
    store: TransactionStore,
    filter: TransactionFilter,
    editor: Option<TransactionEditor>,
}

impl TransactionsView {
    /// Create an empty, not yet loaded view of `owner`'s transactions.
    pub fn new(owner: UserID) -> Self {
        Self {
            store: TransactionStore::new(owner),
            filter: TransactionFilter::default(),
            editor: None,
        }
    }

    /// The user whose transactions are shown.
    pub fn owner(&self) -> UserID {
        self.store.owner()
    }

    /// The cached transactions, unfiltered.
    pub fn store(&self) -> &TransactionStore {
        &self.store
    }

    /// Fetch all of the user's transactions, replacing the cache.
    ///
    /// # Errors
    ///
    /// Returns [Error::LoadFailed] if the fetch failed. The cache is left
    /// empty and the next [TransactionsView::ensure_loaded] tries again.
    pub async fn load<S: TransactionService>(&mut self, service: &S) -> Result<(), Error> {
        match service.list(self.store.owner()).await {
            Ok(records) => {
                tracing::debug!(
                    "Loaded {} transactions for user {}",
                    records.len(),
                    self.store.owner()
                );
                self.store.populate(records);
                Ok(())
            }
            Err(error) => {
                tracing::error!("Failed to load transactions: {error}");
                self.store.mark_load_failed();
                Err(Error::LoadFailed)
            }
        }
    }

    /// Load the transactions unless they already have been.
    pub async fn ensure_loaded<S: TransactionService>(&mut self, service: &S) {
        if self.store.load_state() != LoadState::Loaded {
            // The failure is logged and shown in the snapshot.
            let _ = self.load(service).await;
        }
    }

    /// The active filter.
    pub fn filter(&self) -> &TransactionFilter {
        &self.filter
    }

    /// Replace the active filter.
    pub fn set_filter(&mut self, filter: TransactionFilter) {
        self.filter = filter;
    }

    /// Go back to showing every transaction.
    pub fn reset_filter(&mut self) {
        self.filter.reset();
    }

    /// The transactions that pass the filter, newest first.
    pub fn visible(&self) -> Vec<&TransactionRecord> {
        self.filter.apply(self.store.records())
    }

    /// The totals over the visible transactions.
    pub fn totals(&self) -> Totals {
        Totals::from_records(self.visible())
    }

    /// The message to show if the transactions could not be loaded.
    pub fn load_error(&self) -> Option<&'static str> {
        match self.store.load_state() {
            LoadState::Failed => Some("Failed to load transactions"),
            LoadState::NotLoaded | LoadState::Loaded => None,
        }
    }

    /// Everything the client needs to draw the screen.
    pub fn snapshot(&self) -> TransactionsSnapshot {
        let visible = self.visible();

        TransactionsSnapshot {
            totals: Totals::from_records(visible.iter().copied()),
            count: visible.len(),
            transactions: visible.into_iter().cloned().collect(),
            error: self.load_error().map(str::to_owned),
        }
    }

    /// The open form, if any.
    pub fn editor(&self) -> Option<&TransactionEditor> {
        self.editor.as_ref()
    }

    /// Open a blank form for a new transaction, replacing any open form.
    pub fn open_create(&mut self, today: Date) -> &mut TransactionEditor {
        self.editor.insert(TransactionEditor::create(today))
    }

    /// Open a form for editing the cached transaction with `id`, replacing any open form.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if the transaction is not in the cache.
    pub fn open_edit(&mut self, id: TransactionId) -> Result<&mut TransactionEditor, Error> {
        let record = self.store.get(id).ok_or(Error::NotFound)?;

        Ok(self.editor.insert(TransactionEditor::edit(record)))
    }

    /// Close the open form without saving.
    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    /// Save the open form and update the cache once the remote store confirms it.
    ///
    /// The form is closed on success and kept open with an error message otherwise.
    ///
    /// # Errors
    ///
    /// Returns [Error::FormNotOpen] if no form is open, otherwise see
    /// [TransactionEditor::submit].
    pub async fn submit<S: TransactionService>(
        &mut self,
        service: &S,
    ) -> Result<TransactionRecord, Error> {
        let owner = self.store.owner();
        let editor = self.editor.as_mut().ok_or(Error::FormNotOpen)?;
        let mode = editor.mode();

        let record = editor.submit(owner, service).await?;

        match mode {
            FormMode::Create => self.store.prepend(record.clone())?,
            FormMode::Edit(_) => self.store.replace(record.clone())?,
        }
        self.editor = None;

        Ok(record)
    }

    /// Ask to delete the cached transaction with `id`.
    ///
    /// Nothing is deleted until the returned confirmation is passed to
    /// [TransactionsView::confirm_delete].
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if the transaction is not in the cache.
    pub fn request_delete(&self, id: TransactionId) -> Result<DeleteConfirmation, Error> {
        if self.store.contains(id) {
            Ok(DeleteConfirmation { id })
        } else {
            Err(Error::NotFound)
        }
    }

    /// Delete a transaction the user confirmed, removing it from the cache
    /// once the remote store confirms it.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::DeleteMissingTransaction] if the remote store had no such transaction,
    /// - [Error::DeleteFailed] if the remote store failed.
    ///
    /// The cache is unchanged in both cases.
    pub async fn confirm_delete<S: TransactionService>(
        &mut self,
        confirmation: DeleteConfirmation,
        service: &S,
    ) -> Result<TransactionRecord, Error> {
        let id = confirmation.id;

        match service.delete(id).await {
            Ok(true) => {
                if self.editor.as_ref().map(TransactionEditor::mode) == Some(FormMode::Edit(id)) {
                    self.editor = None;
                }

                self.store.remove(id).ok_or(Error::DeleteMissingTransaction)
            }
            Ok(false) => {
                tracing::warn!("Tried to delete transaction {id} but it does not exist");
                Err(Error::DeleteMissingTransaction)
            }
            Err(error) => {
                tracing::error!("Failed to delete transaction {id}: {error}");
                Err(Error::DeleteFailed)
            }
        }
    }
}
