//! The transaction engine.
//!
//! This module contains everything related to transactions:
//! - The [TransactionRecord] model and the [TransactionService] the records live behind
//! - The per-session [TransactionStore] cache and the [TransactionFilter] and [Totals] derived from it
//! - The [TransactionEditor] that validates and saves the create/edit form
//! - The [TransactionsView] that ties them together, and its route handlers
//! - The SQL for storing transactions

mod core;
mod db;
mod endpoints;
mod filter;
mod form;
mod store;
#[cfg(test)]
pub(crate) mod test_utils;
mod totals;
mod view;

pub use core::{
    NewTransaction, TransactionId, TransactionRecord, TransactionService, TransactionUpdate,
};
pub use db::{
    create_transaction_table, delete_transaction, get_transaction, get_transactions_for_user,
    insert_transaction, update_transaction,
};
pub use endpoints::{
    DeleteQuery, create_transaction_endpoint, delete_transaction_endpoint,
    edit_transaction_endpoint, get_edit_form_endpoint, get_new_form_endpoint,
    get_transactions_endpoint,
};
pub use filter::{CategoryFilter, KindFilter, TransactionFilter, TransactionFilterQuery};
pub use form::{
    FormError, FormMode, FormState, TransactionEditor, TransactionForm, ValidatedTransaction,
};
pub use store::{LoadState, TransactionStore};
pub use totals::Totals;
pub use view::{DeleteConfirmation, TransactionsSnapshot, TransactionsView};
