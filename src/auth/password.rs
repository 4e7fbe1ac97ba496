//! The route handler for changing the signed-in user's password.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    Error, ValidatedPassword,
    auth::{Session, service},
    backend::SqliteBackend,
};

/// The data for a password change.
#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordForm {
    /// The new password.
    pub password: String,
    /// The new password again.
    pub confirm_password: String,
}

/// A route handler for changing the signed-in user's password.
///
/// The session stays valid, other sessions of the same user are not ended.
///
/// # Errors
///
/// Returns:
/// - [Error::InvalidPassword] or [Error::PasswordsDoNotMatch] if the new password is unusable,
/// - [Error::Auth] if the identity provider rejected the change.
pub async fn update_password_endpoint(
    State(backend): State<SqliteBackend>,
    Extension(session): Extension<Session>,
    Json(form): Json<PasswordForm>,
) -> Result<StatusCode, Error> {
    let password = ValidatedPassword::new(&form.password)?;

    if form.password != form.confirm_password {
        return Err(Error::PasswordsDoNotMatch);
    }

    service::update_password(&backend, &backend, session.user_id, password).await?;

    Ok(StatusCode::NO_CONTENT)
}
