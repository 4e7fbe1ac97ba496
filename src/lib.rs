//! Finance Tracker is a web app for recording personal income and expenses.
//!
//! The heart of the crate is the transaction engine in [transaction]: a
//! per-session, write-through mirror of the user's transactions with pure
//! filtering and aggregation on top, and a form controller that only touches
//! the mirror once the backend has confirmed a change.
//!
//! Identity, persistence and auditing are reached through the traits in
//! [auth], [transaction], [profile] and [audit]. The [backend] module
//! implements all of them on top of SQLite, and [build_router] serves the
//! whole thing as a JSON API.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
pub mod audit;
pub mod auth;
pub mod backend;
pub mod category;
mod db;
pub mod endpoints;
mod logging;
pub mod money;
pub mod password;
pub mod profile;
mod routing;
#[cfg(test)]
mod test_utils;
pub mod transaction;
pub mod user;
pub mod workspace;

pub use app_state::{AppState, create_cookie_key};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use user::{User, UserID};

use crate::{auth::AuthError, transaction::FormError};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request did not carry a valid, unexpired session.
    #[error("you must be signed in to do that")]
    Unauthenticated,

    /// The password does not satisfy the password rules.
    ///
    /// The string is a message explaining which rule was broken.
    #[error("{0}")]
    InvalidPassword(String),

    /// The email address is not in a valid format.
    #[error("Please enter a valid email address.")]
    InvalidEmail,

    /// The display name does not satisfy the name rules.
    #[error("{0}")]
    InvalidName(String),

    /// The password and its confirmation differ.
    #[error("Passwords do not match.")]
    PasswordsDoNotMatch,

    /// A currency code that is not three letters, e.g. "PHP".
    #[error("invalid currency code \"{0}\", expected three letters such as PHP")]
    InvalidCurrency(String),

    /// A user with the email address already exists.
    #[error("An account with this email already exists.")]
    DuplicateEmail,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The identity provider rejected the request.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A category name that is not part of the taxonomy.
    #[error("Unknown category: {0}.")]
    UnknownCategory(String),

    /// A transaction kind other than "income" or "expense".
    #[error("Unknown transaction type: {0}.")]
    UnknownTransactionKind(String),

    /// A date that is not in the `YYYY-MM-DD` format.
    #[error("invalid date \"{0}\", dates must be formatted as YYYY-MM-DD")]
    InvalidDate(String),

    /// The transaction form did not pass validation.
    #[error(transparent)]
    Validation(#[from] FormError),

    /// A save was requested while another save for the same form was still in flight.
    #[error("a save is already in progress")]
    SaveInProgress,

    /// A transaction form was submitted without being opened.
    #[error("there is no open transaction form")]
    FormNotOpen,

    /// Another operation on the same session is still in flight.
    #[error("another request for this session is still in progress, try again shortly")]
    OperationInProgress,

    /// A destructive action was requested without the user confirming it.
    #[error("deleting a transaction must be confirmed")]
    ConfirmationRequired,

    /// The backend rejected or failed to complete a save.
    ///
    /// The underlying error is logged where it happened.
    #[error("Failed to save transaction")]
    SaveFailed,

    /// The backend rejected or failed to complete a delete.
    #[error("Failed to delete transaction")]
    DeleteFailed,

    /// The initial fetch of the user's transactions failed.
    #[error("Failed to load transactions")]
    LoadFailed,

    /// A record belonging to another user was handed to the current session.
    #[error("the record does not belong to the signed in user")]
    ForeignRecord,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that does not exist")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that does not exist")]
    DeleteMissingTransaction,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A background task panicked or was cancelled.
    #[error("a background task failed: {0}")]
    TaskFailed(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code that best describes the error to the client.
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Auth(error) => error.status_code(),
            Error::InvalidPassword(_)
            | Error::InvalidEmail
            | Error::InvalidName(_)
            | Error::PasswordsDoNotMatch
            | Error::InvalidCurrency(_)
            | Error::UnknownCategory(_)
            | Error::UnknownTransactionKind(_)
            | Error::InvalidDate(_) => StatusCode::BAD_REQUEST,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::DuplicateEmail
            | Error::SaveInProgress
            | Error::FormNotOpen
            | Error::OperationInProgress => StatusCode::CONFLICT,
            Error::ConfirmationRequired => StatusCode::PRECONDITION_REQUIRED,
            Error::SaveFailed | Error::DeleteFailed | Error::LoadFailed => StatusCode::BAD_GATEWAY,
            Error::ForeignRecord => StatusCode::FORBIDDEN,
            Error::NotFound | Error::UpdateMissingTransaction | Error::DeleteMissingTransaction => {
                StatusCode::NOT_FOUND
            }
            Error::HashingError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::TaskFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the client.
    ///
    /// Internal errors are replaced with a generic message, the details only
    /// go to the server logs.
    fn client_message(&self) -> String {
        match self {
            Error::UpdateMissingTransaction => {
                "The transaction could not be found.".to_owned()
            }
            Error::DeleteMissingTransaction => "The transaction could not be found. \
                Try refreshing to see if the transaction has already been deleted."
                .to_owned(),
            Error::Auth(error) => error.friendly_message(),
            error if error.status_code() == StatusCode::INTERNAL_SERVER_ERROR => {
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            error => error.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if status_code == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        let body = match &self {
            Error::Validation(error) => json!({
                "error": self.client_message(),
                "field": error.field(),
            }),
            _ => json!({ "error": self.client_message() }),
        };

        (status_code, Json(body)).into_response()
    }
}
