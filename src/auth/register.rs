//! The route handler for registering a new account.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    AppState, Error, ValidatedPassword,
    auth::{SignUp, SignUpOutcome, log_in::start_session, service},
    user::{DisplayName, EmailAddress},
};

/// The message sent when the account must be confirmed before signing in.
pub const CONFIRMATION_PENDING_MESSAGE: &str = "Please check your email for a confirmation link.";

/// The data for a registration request.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterForm {
    /// The name to show in the app.
    pub name: String,
    /// The email address to sign in with.
    pub email: String,
    /// The password to sign in with.
    pub password: String,
    /// The password again, to catch typos.
    pub confirm_password: String,
}

impl RegisterForm {
    /// Check the fields in the order they appear on the form.
    fn validate(&self) -> Result<SignUp, Error> {
        let name = DisplayName::new(&self.name)?;
        let email = EmailAddress::new(&self.email)?;
        let password = ValidatedPassword::new(&self.password)?;

        if self.password != self.confirm_password {
            return Err(Error::PasswordsDoNotMatch);
        }

        Ok(SignUp {
            email,
            password,
            name,
        })
    }
}

/// A route handler for registering a new account.
///
/// Responds with 201 Created and sets the session cookie if the account can
/// be used straight away, or 202 Accepted if it must be confirmed first.
///
/// # Errors
///
/// Returns:
/// - [Error::InvalidName], [Error::InvalidEmail], [Error::InvalidPassword] or
///   [Error::PasswordsDoNotMatch] if a field is invalid,
/// - [Error::Auth] if the identity provider refused the account, e.g. because
///   the email is already registered.
pub async fn register_user(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(form): Json<RegisterForm>,
) -> Result<Response, Error> {
    let request = form.validate()?;

    let outcome = service::sign_up(
        &state.backend,
        &state.backend,
        request,
        state.cookie_duration,
    )
    .await?;

    Ok(sign_up_response(&state, jar, outcome).await)
}

/// The response to a successful registration.
///
/// A signed-in user gets a 201 with their session cookie. A user who must
/// confirm their email address first gets a 202 and no cookie.
pub(crate) async fn sign_up_response(
    state: &AppState,
    jar: PrivateCookieJar,
    outcome: SignUpOutcome,
) -> Response {
    match outcome.session {
        Some(session) => {
            let (jar, body) = start_session(state, jar, session).await;
            (StatusCode::CREATED, jar, body).into_response()
        }
        None => {
            tracing::debug!("User {} must confirm their email address", outcome.user_id);
            (
                StatusCode::ACCEPTED,
                Json(json!({ "message": CONFIRMATION_PENDING_MESSAGE })),
            )
                .into_response()
        }
    }
}
