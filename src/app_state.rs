//! Implements a struct that holds the state of the REST server.

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{Error, backend::SqliteBackend, workspace::WorkspaceRegistry};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// How long sessions and their cookies last after the last request.
    pub cookie_duration: Duration,

    /// The identity provider, audit log and data store.
    pub backend: SqliteBackend,

    /// The open workspace of every signed-in session.
    pub workspaces: WorkspaceRegistry,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        cookie_duration: Duration,
    ) -> Result<Self, Error> {
        let backend = SqliteBackend::new(db_connection)?;

        Ok(Self::with_backend(backend, cookie_secret, cookie_duration))
    }

    /// Create a new [AppState] around an existing backend.
    pub fn with_backend(
        backend: SqliteBackend,
        cookie_secret: &str,
        cookie_duration: Duration,
    ) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration,
            backend,
            workspaces: WorkspaceRegistry::new(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for SqliteBackend {
    fn from_ref(state: &AppState) -> Self {
        state.backend.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
