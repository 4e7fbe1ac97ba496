use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use serde_json::Value;

use crate::{
    Error, UserID,
    audit::{AuditAction, AuditEvent, AuditSink, insert_audit_event},
    profile::{
        NewProfile, Profile, ProfileService, ProfileUpdate, get_profile, insert_profile,
        update_profile,
    },
    transaction::{
        NewTransaction, TransactionId, TransactionRecord, TransactionService, TransactionUpdate,
        delete_transaction, get_transaction, get_transactions_for_user, insert_transaction,
        update_transaction,
    },
};

const TRANSACTION_TABLE: &str = "transaction";

/// Data access on behalf of one signed-in user.
///
/// Every query is restricted to the user's own rows: reads of other users'
/// data come back empty and writes are refused.
#[derive(Debug, Clone)]
pub struct BackendClient {
    connection: Arc<Mutex<Connection>>,
    user_id: UserID,
}

impl BackendClient {
    pub(super) fn new(connection: Arc<Mutex<Connection>>, user_id: UserID) -> Self {
        Self {
            connection,
            user_id,
        }
    }

    /// The user the client acts for.
    pub fn user_id(&self) -> UserID {
        self.user_id
    }

    fn lock_connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)
    }

    fn check_user(&self, user_id: UserID) -> Result<(), Error> {
        if user_id == self.user_id {
            Ok(())
        } else {
            tracing::warn!(
                "User {} tried to act on data owned by user {user_id}",
                self.user_id
            );
            Err(Error::ForeignRecord)
        }
    }

    fn audit(&self, event: AuditEvent, connection: &Connection) {
        if let Err(error) = insert_audit_event(&event.user(self.user_id), connection) {
            tracing::error!("Could not record audit event: {error}");
        }
    }
}

fn record_values(record: &TransactionRecord) -> Value {
    serde_json::to_value(record).unwrap_or_else(|error| {
        tracing::error!(
            "Could not serialize transaction {} for the audit log: {error}",
            record.id
        );
        Value::Null
    })
}

impl TransactionService for BackendClient {
    async fn list(&self, owner: UserID) -> Result<Vec<TransactionRecord>, Error> {
        if self.check_user(owner).is_err() {
            return Ok(Vec::new());
        }

        let connection = self.lock_connection()?;
        get_transactions_for_user(owner, &connection)
    }

    async fn create(&self, transaction: NewTransaction) -> Result<TransactionRecord, Error> {
        self.check_user(transaction.owner_id)?;

        let connection = self.lock_connection()?;
        let record = insert_transaction(&transaction, &connection)?;
        self.audit(
            AuditEvent::new(AuditAction::TransactionCreated)
                .table(TRANSACTION_TABLE)
                .record(record.id)
                .new_values(record_values(&record)),
            &connection,
        );

        Ok(record)
    }

    async fn update(
        &self,
        id: TransactionId,
        update: TransactionUpdate,
    ) -> Result<TransactionRecord, Error> {
        let connection = self.lock_connection()?;
        let old = get_transaction(id, self.user_id, &connection).map_err(|error| match error {
            Error::NotFound => Error::UpdateMissingTransaction,
            error => error,
        })?;
        let new = update_transaction(id, self.user_id, &update, &connection)?;
        self.audit(
            AuditEvent::new(AuditAction::TransactionUpdated)
                .table(TRANSACTION_TABLE)
                .record(id)
                .old_values(record_values(&old))
                .new_values(record_values(&new)),
            &connection,
        );

        Ok(new)
    }

    async fn delete(&self, id: TransactionId) -> Result<bool, Error> {
        let connection = self.lock_connection()?;
        let old = match get_transaction(id, self.user_id, &connection) {
            Ok(old) => old,
            Err(Error::NotFound) => return Ok(false),
            Err(error) => return Err(error),
        };

        let deleted = delete_transaction(id, self.user_id, &connection)?;
        if deleted {
            self.audit(
                AuditEvent::new(AuditAction::TransactionDeleted)
                    .table(TRANSACTION_TABLE)
                    .record(id)
                    .old_values(record_values(&old)),
                &connection,
            );
        }

        Ok(deleted)
    }
}

impl ProfileService for BackendClient {
    async fn get(&self, user_id: UserID) -> Result<Option<Profile>, Error> {
        if self.check_user(user_id).is_err() {
            return Ok(None);
        }

        let connection = self.lock_connection()?;
        get_profile(user_id, &connection)
    }

    async fn create(&self, profile: NewProfile) -> Result<Profile, Error> {
        self.check_user(profile.id)?;

        let connection = self.lock_connection()?;
        insert_profile(&profile, &connection)
    }

    async fn update(&self, user_id: UserID, update: ProfileUpdate) -> Result<Profile, Error> {
        self.check_user(user_id)?;

        let connection = self.lock_connection()?;
        update_profile(user_id, &update, &connection)
    }
}

impl AuditSink for BackendClient {
    async fn log_event(&self, event: AuditEvent) {
        let event = match event.user_id {
            Some(_) => event,
            None => event.user(self.user_id),
        };

        match self.lock_connection() {
            Ok(connection) => {
                if let Err(error) = insert_audit_event(&event, &connection) {
                    tracing::error!("Could not record audit event: {error}");
                }
            }
            Err(error) => tracing::error!("Could not record audit event: {error}"),
        }
    }
}
