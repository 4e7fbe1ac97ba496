//! Transaction records and the service that stores them.

use std::future::Future;

use serde::{Deserialize, Serialize};
use time::{
    Date, OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::{
    Error, UserID,
    category::{Category, TransactionKind},
    money::Money,
};

/// Alias for the integer type the store uses for transaction IDs.
pub type TransactionId = i64;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` date, ignoring surrounding whitespace.
pub(crate) fn parse_date(text: &str) -> Option<Date> {
    Date::parse(text.trim(), DATE_FORMAT).ok()
}

/// An income or expense entry owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// The ID assigned by the store.
    pub id: TransactionId,
    /// The user who owns the transaction.
    pub owner_id: UserID,
    /// When the transaction happened.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// Whether money came in or went out.
    pub kind: TransactionKind,
    /// What the money was for.
    pub category: Category,
    /// How much money, always greater than zero.
    pub amount: Money,
    /// Free text notes.
    pub notes: Option<String>,
    /// When the record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the record was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl TransactionRecord {
    /// The notes, or the empty string if there are none.
    pub fn notes_or_empty(&self) -> &str {
        self.notes.as_deref().unwrap_or_default()
    }
}

/// The fields of a transaction that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    /// The user who will own the transaction.
    pub owner_id: UserID,
    /// When the transaction happened.
    pub date: Date,
    /// Whether money came in or went out.
    pub kind: TransactionKind,
    /// What the money was for.
    pub category: Category,
    /// How much money.
    pub amount: Money,
    /// Free text notes.
    pub notes: Option<String>,
}

/// The editable fields of a stored transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUpdate {
    /// When the transaction happened.
    pub date: Date,
    /// Whether money came in or went out.
    pub kind: TransactionKind,
    /// What the money was for.
    pub category: Category,
    /// How much money.
    pub amount: Money,
    /// Free text notes.
    pub notes: Option<String>,
}

/// The remote store of transactions.
///
/// Implementations only ever act on the records of the user they were
/// authorized for.
pub trait TransactionService {
    /// Get all of `owner`'s transactions, newest first by date and then by ID.
    fn list(
        &self,
        owner: UserID,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, Error>> + Send;

    /// Store a new transaction and return it with its ID and timestamps.
    fn create(
        &self,
        transaction: NewTransaction,
    ) -> impl Future<Output = Result<TransactionRecord, Error>> + Send;

    /// Overwrite the editable fields of the transaction with `id`.
    fn update(
        &self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> impl Future<Output = Result<TransactionRecord, Error>> + Send;

    /// Delete the transaction with `id`.
    ///
    /// Returns `false` if there was no such transaction.
    fn delete(&self, id: TransactionId) -> impl Future<Output = Result<bool, Error>> + Send;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::{OffsetDateTime, macros::date};

    use crate::{
        UserID,
        category::{Category, TransactionKind},
        money::Money,
        transaction::{TransactionRecord, core::parse_date},
    };

    #[test]
    fn serializes_date_and_amount_for_the_wire() {
        let record = TransactionRecord {
            id: 1,
            owner_id: UserID::new(2),
            date: date!(2025 - 03 - 09),
            kind: TransactionKind::Expense,
            category: Category::OtherExpense,
            amount: Money::from_minor_units(1250),
            notes: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };

        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["date"], json!("2025-03-09"));
        assert_eq!(value["kind"], json!("expense"));
        assert_eq!(value["category"], json!("Other Expense"));
        assert_eq!(value["amount"], json!(12.5));
        assert_eq!(value["notes"], json!(null));
    }

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(parse_date(" 2025-03-09 "), Some(date!(2025 - 03 - 09)));
        assert_eq!(parse_date("2025-02-30"), None);
        assert_eq!(parse_date("09/03/2025"), None);
        assert_eq!(parse_date(""), None);
    }
}
