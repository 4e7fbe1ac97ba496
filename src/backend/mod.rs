//! A SQLite stand-in for the hosted backend.
//!
//! [SqliteBackend] plays the identity provider and the audit log. Data access
//! goes through a [BackendClient], which is bound to one signed-in user and
//! only ever reads or writes that user's rows.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use rusqlite::Connection;
use time::OffsetDateTime;
use tokio::sync::broadcast;

use crate::{
    Error, PasswordHash, UserID,
    audit::{AuditEvent, AuditSink, insert_audit_event},
    auth::{Session, SessionEvent, SessionId},
    initialize_db,
};

mod client;
mod identity;

pub use client::BackendClient;

/// How many session events can be buffered for slow listeners.
const SESSION_EVENT_CAPACITY: usize = 64;

/// The identity provider, audit log and data store, backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    connection: Arc<Mutex<Connection>>,
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    events: broadcast::Sender<SessionEvent>,
    password_cost: u32,
}

impl SqliteBackend {
    /// Create a backend on `connection`, creating the tables if needed.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the tables could not be created.
    pub fn new(connection: Connection) -> Result<Self, Error> {
        initialize_db(&connection)?;
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            events,
            password_cost: PasswordHash::DEFAULT_COST,
        })
    }

    /// Set the bcrypt cost used for new password hashes.
    ///
    /// Tests use a low cost to keep them fast.
    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }

    /// The underlying database connection.
    pub fn connection(&self) -> &Arc<Mutex<Connection>> {
        &self.connection
    }

    /// Get a client that acts on behalf of the user with `user_id`.
    pub fn client(&self, user_id: UserID) -> BackendClient {
        BackendClient::new(self.connection.clone(), user_id)
    }

    /// Discard every session that has expired, notifying listeners.
    ///
    /// Returns the number of sessions discarded.
    pub fn purge_expired_sessions(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let expired: Vec<SessionId> = {
            let mut sessions = self.lock_sessions();
            let expired = sessions
                .values()
                .filter(|session| session.is_expired_at(now))
                .map(|session| session.id)
                .collect::<Vec<_>>();

            for id in &expired {
                sessions.remove(id);
            }

            expired
        };

        for id in &expired {
            self.broadcast(SessionEvent::Expired(*id));
        }

        expired.len()
    }

    fn lock_connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<SessionId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn broadcast(&self, event: SessionEvent) {
        // Sending only fails when nobody is listening.
        let _ = self.events.send(event);
    }
}

impl AuditSink for SqliteBackend {
    async fn log_event(&self, event: AuditEvent) {
        let result = self
            .lock_connection()
            .and_then(|connection| insert_audit_event(&event, &connection));

        if let Err(error) = result {
            tracing::error!(
                "Could not record {} audit event: {error}",
                event.action.as_str()
            );
        }
    }
}
