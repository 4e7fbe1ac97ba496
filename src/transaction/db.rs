//! SQL for the transaction table. Every query is scoped to the owning user.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    transaction::{NewTransaction, TransactionId, TransactionRecord, TransactionUpdate},
};

const COLUMNS: &str = "id, user_id, date, kind, category, amount, notes, created_at, updated_at";

/// Create the transaction table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                kind TEXT NOT NULL,
                category TEXT NOT NULL,
                amount INTEGER NOT NULL CHECK (amount > 0),
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Speeds up fetching a user's transactions newest first.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date
         ON \"transaction\"(user_id, date DESC, id DESC)",
        (),
    )?;

    Ok(())
}

/// Insert a new transaction.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn insert_transaction(
    transaction: &NewTransaction,
    connection: &Connection,
) -> Result<TransactionRecord, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
                (user_id, date, kind, category, amount, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             RETURNING {COLUMNS}"
        ))?
        .query_row(
            (
                transaction.owner_id.as_i64(),
                transaction.date,
                transaction.kind,
                transaction.category,
                transaction.amount,
                &transaction.notes,
                now,
            ),
            map_transaction_row,
        )
        .map_err(Error::from)
}

/// Get all of `owner`'s transactions, newest first by date and then by ID.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn get_transactions_for_user(
    owner: UserID,
    connection: &Connection,
) -> Result<Vec<TransactionRecord>, Error> {
    connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM \"transaction\"
             WHERE user_id = :user_id
             ORDER BY date DESC, id DESC"
        ))?
        .query_map(&[(":user_id", &owner.as_i64())], map_transaction_row)?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}

/// Get `owner`'s transaction with `id`.
///
/// # Errors
/// Returns an [Error::NotFound] if `owner` has no transaction with `id`.
pub fn get_transaction(
    id: TransactionId,
    owner: UserID,
    connection: &Connection,
) -> Result<TransactionRecord, Error> {
    connection
        .prepare(&format!(
            "SELECT {COLUMNS} FROM \"transaction\" WHERE id = :id AND user_id = :user_id"
        ))?
        .query_row(
            &[(":id", &id), (":user_id", &owner.as_i64())],
            map_transaction_row,
        )
        .map_err(Error::from)
}

/// Overwrite the editable fields of `owner`'s transaction with `id`.
///
/// # Errors
/// Returns an [Error::UpdateMissingTransaction] if `owner` has no transaction with `id`.
pub fn update_transaction(
    id: TransactionId,
    owner: UserID,
    update: &TransactionUpdate,
    connection: &Connection,
) -> Result<TransactionRecord, Error> {
    connection
        .prepare(&format!(
            "UPDATE \"transaction\"
             SET date = ?1, kind = ?2, category = ?3, amount = ?4, notes = ?5, updated_at = ?6
             WHERE id = ?7 AND user_id = ?8
             RETURNING {COLUMNS}"
        ))?
        .query_row(
            (
                update.date,
                update.kind,
                update.category,
                update.amount,
                &update.notes,
                OffsetDateTime::now_utc(),
                id,
                owner.as_i64(),
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingTransaction,
            error => error.into(),
        })
}

/// Delete `owner`'s transaction with `id`.
///
/// Returns `false` if `owner` has no transaction with `id`.
///
/// # Errors
/// Returns an [Error::SqlError] if there is an SQL error.
pub fn delete_transaction(
    id: TransactionId,
    owner: UserID,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
        &[(":id", &id), (":user_id", &owner.as_i64())],
    )?;

    Ok(rows_affected > 0)
}

fn map_transaction_row(row: &Row) -> Result<TransactionRecord, rusqlite::Error> {
    Ok(TransactionRecord {
        id: row.get(0)?,
        owner_id: UserID::new(row.get(1)?),
        date: row.get(2)?,
        kind: row.get(3)?,
        category: row.get(4)?,
        amount: row.get(5)?,
        notes: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error, PasswordHash, UserID,
        category::{Category, TransactionKind},
        initialize_db,
        money::Money,
        transaction::{
            NewTransaction, TransactionUpdate, delete_transaction, get_transaction,
            get_transactions_for_user, insert_transaction, update_transaction,
        },
        user::{EmailAddress, create_user},
    };

    fn get_connection_with_users() -> (Connection, UserID, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize_db(&connection).unwrap();
        let alice = create_user(
            &EmailAddress::new("alice@example.com").unwrap(),
            "Alice",
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();
        let bob = create_user(
            &EmailAddress::new("bob@example.com").unwrap(),
            "Bob",
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();

        (connection, alice.id, bob.id)
    }

    fn new_transaction(owner_id: UserID, date: time::Date, minor_units: i64) -> NewTransaction {
        NewTransaction {
            owner_id,
            date,
            kind: TransactionKind::Expense,
            category: Category::Health,
            amount: Money::from_minor_units(minor_units),
            notes: Some("Pharmacy".to_owned()),
        }
    }

    #[test]
    fn insert_returns_stored_record() {
        let (connection, alice, _) = get_connection_with_users();
        let transaction = new_transaction(alice, date!(2025 - 07 - 01), 45_000);

        let record = insert_transaction(&transaction, &connection).unwrap();

        assert!(record.id > 0);
        assert_eq!(record.owner_id, alice);
        assert_eq!(record.date, transaction.date);
        assert_eq!(record.category, Category::Health);
        assert_eq!(record.amount, Money::from_minor_units(45_000));
        assert_eq!(record.notes.as_deref(), Some("Pharmacy"));
        assert_eq!(record.created_at, record.updated_at);
    }

    #[test]
    fn list_is_scoped_to_owner_and_newest_first() {
        let (connection, alice, bob) = get_connection_with_users();
        let first = insert_transaction(
            &new_transaction(alice, date!(2025 - 07 - 01), 1),
            &connection,
        )
        .unwrap();
        let second = insert_transaction(
            &new_transaction(alice, date!(2025 - 07 - 02), 2),
            &connection,
        )
        .unwrap();
        let same_day = insert_transaction(
            &new_transaction(alice, date!(2025 - 07 - 02), 3),
            &connection,
        )
        .unwrap();
        insert_transaction(&new_transaction(bob, date!(2025 - 07 - 03), 4), &connection).unwrap();

        let ids: Vec<_> = get_transactions_for_user(alice, &connection)
            .unwrap()
            .into_iter()
            .map(|record| record.id)
            .collect();

        assert_eq!(ids, [same_day.id, second.id, first.id]);
    }

    #[test]
    fn update_changes_fields() {
        let (connection, alice, _) = get_connection_with_users();
        let record = insert_transaction(
            &new_transaction(alice, date!(2025 - 07 - 01), 100),
            &connection,
        )
        .unwrap();

        let updated = update_transaction(
            record.id,
            alice,
            &TransactionUpdate {
                date: date!(2025 - 07 - 05),
                kind: TransactionKind::Income,
                category: Category::Freelance,
                amount: Money::from_minor_units(200),
                notes: None,
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.id, record.id);
        assert_eq!(updated.kind, TransactionKind::Income);
        assert_eq!(updated.category, Category::Freelance);
        assert_eq!(updated.notes, None);
        assert_eq!(get_transaction(record.id, alice, &connection), Ok(updated));
    }

    #[test]
    fn cannot_touch_other_users_transactions() {
        let (connection, alice, bob) = get_connection_with_users();
        let record = insert_transaction(
            &new_transaction(alice, date!(2025 - 07 - 01), 100),
            &connection,
        )
        .unwrap();

        assert_eq!(
            get_transaction(record.id, bob, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            update_transaction(
                record.id,
                bob,
                &TransactionUpdate {
                    date: record.date,
                    kind: record.kind,
                    category: record.category,
                    amount: record.amount,
                    notes: None,
                },
                &connection,
            ),
            Err(Error::UpdateMissingTransaction)
        );
        assert_eq!(delete_transaction(record.id, bob, &connection), Ok(false));
        assert!(get_transaction(record.id, alice, &connection).is_ok());
    }

    #[test]
    fn delete_removes_record() {
        let (connection, alice, _) = get_connection_with_users();
        let record = insert_transaction(
            &new_transaction(alice, date!(2025 - 07 - 01), 100),
            &connection,
        )
        .unwrap();

        assert_eq!(delete_transaction(record.id, alice, &connection), Ok(true));
        assert_eq!(delete_transaction(record.id, alice, &connection), Ok(false));
        assert_eq!(
            get_transaction(record.id, alice, &connection),
            Err(Error::NotFound)
        );
    }
}
