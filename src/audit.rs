//! Audit trail of security-relevant and data-changing actions.
//!
//! Audit logging is fire-and-forget: an [AuditSink] must never fail or delay
//! the action it records. Sinks log their own failures and swallow them.

use std::future::Future;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::{Error, UserID};

/// An action recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    /// A new account was registered.
    #[serde(rename = "SIGNUP_SUCCESS")]
    SignUpSuccess,
    /// A registration attempt was rejected.
    #[serde(rename = "SIGNUP_FAILED")]
    SignUpFailed,
    /// A user signed in.
    #[serde(rename = "SIGNIN_SUCCESS")]
    SignInSuccess,
    /// A sign-in attempt was rejected.
    #[serde(rename = "SIGNIN_FAILED")]
    SignInFailed,
    /// A user signed out.
    #[serde(rename = "SIGNOUT_SUCCESS")]
    SignOutSuccess,
    /// A user changed their password.
    #[serde(rename = "PASSWORD_UPDATED")]
    PasswordUpdated,
    /// A transaction was created.
    #[serde(rename = "TRANSACTION_CREATED")]
    TransactionCreated,
    /// A transaction was edited.
    #[serde(rename = "TRANSACTION_UPDATED")]
    TransactionUpdated,
    /// A transaction was deleted.
    #[serde(rename = "TRANSACTION_DELETED")]
    TransactionDeleted,
}

impl AuditAction {
    /// The name stored in the audit log.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::SignUpSuccess => "SIGNUP_SUCCESS",
            AuditAction::SignUpFailed => "SIGNUP_FAILED",
            AuditAction::SignInSuccess => "SIGNIN_SUCCESS",
            AuditAction::SignInFailed => "SIGNIN_FAILED",
            AuditAction::SignOutSuccess => "SIGNOUT_SUCCESS",
            AuditAction::PasswordUpdated => "PASSWORD_UPDATED",
            AuditAction::TransactionCreated => "TRANSACTION_CREATED",
            AuditAction::TransactionUpdated => "TRANSACTION_UPDATED",
            AuditAction::TransactionDeleted => "TRANSACTION_DELETED",
        }
    }
}

/// One entry for the audit trail.
///
/// Build with [AuditEvent::new] and the chained setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// What happened.
    pub action: AuditAction,
    /// The table (or subsystem, e.g. "auth") the action touched.
    pub table_name: Option<String>,
    /// The user who performed the action, if known.
    pub user_id: Option<UserID>,
    /// The ID of the affected record.
    pub record_id: Option<String>,
    /// The state of the record before the action.
    pub old_values: Option<Value>,
    /// The state of the record after the action, or other context.
    pub new_values: Option<Value>,
}

impl AuditEvent {
    /// Start an event for `action` with no context.
    pub fn new(action: AuditAction) -> Self {
        Self {
            action,
            table_name: None,
            user_id: None,
            record_id: None,
            old_values: None,
            new_values: None,
        }
    }

    /// Set the table or subsystem name.
    pub fn table(mut self, table_name: &str) -> Self {
        self.table_name = Some(table_name.to_owned());
        self
    }

    /// Set the acting user.
    pub fn user(mut self, user_id: UserID) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the affected record.
    pub fn record(mut self, record_id: impl ToString) -> Self {
        self.record_id = Some(record_id.to_string());
        self
    }

    /// Set the state before the action.
    pub fn old_values(mut self, values: Value) -> Self {
        self.old_values = Some(values);
        self
    }

    /// Set the state after the action.
    pub fn new_values(mut self, values: Value) -> Self {
        self.new_values = Some(values);
        self
    }
}

/// Somewhere to send audit events.
pub trait AuditSink {
    /// Record `event`.
    ///
    /// Implementations must not return an error or panic: failures are logged
    /// and otherwise ignored.
    fn log_event(&self, event: AuditEvent) -> impl Future<Output = ()> + Send;
}

/// Create the audit log table.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_audit_log_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                action TEXT NOT NULL,
                table_name TEXT,
                record_id TEXT,
                old_values TEXT,
                new_values TEXT,
                timestamp TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Insert `event` into the audit log, stamped with the current time.
///
/// # Errors
/// Returns an [Error::SqlError] if the row could not be inserted.
pub fn insert_audit_event(event: &AuditEvent, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO audit_log (user_id, action, table_name, record_id, old_values, new_values, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            event.user_id.map(|id| id.as_i64()),
            event.action.as_str(),
            &event.table_name,
            &event.record_id,
            event.old_values.as_ref().map(Value::to_string),
            event.new_values.as_ref().map(Value::to_string),
            OffsetDateTime::now_utc(),
        ),
    )?;

    Ok(())
}

/// Get the recorded actions in insertion order.
#[cfg(test)]
pub fn get_audit_actions(connection: &Connection) -> Result<Vec<String>, Error> {
    connection
        .prepare("SELECT action FROM audit_log ORDER BY id ASC")?
        .query_map([], |row| row.get(0))?
        .map(|action| action.map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        UserID,
        audit::{
            AuditAction, AuditEvent, create_audit_log_table, get_audit_actions, insert_audit_event,
        },
    };

    #[test]
    fn inserts_events_in_order() {
        let connection = Connection::open_in_memory().unwrap();
        create_audit_log_table(&connection).unwrap();

        insert_audit_event(
            &AuditEvent::new(AuditAction::SignInFailed)
                .table("auth")
                .new_values(json!({ "email": "foo@bar.baz" })),
            &connection,
        )
        .unwrap();
        insert_audit_event(
            &AuditEvent::new(AuditAction::SignInSuccess)
                .table("auth")
                .user(UserID::new(1)),
            &connection,
        )
        .unwrap();

        assert_eq!(
            get_audit_actions(&connection).unwrap(),
            ["SIGNIN_FAILED", "SIGNIN_SUCCESS"]
        );
    }

    #[test]
    fn action_names_match_serialized_names() {
        let action = AuditAction::TransactionDeleted;

        assert_eq!(
            serde_json::to_string(&action).unwrap(),
            format!("\"{}\"", action.as_str())
        );
    }
}
