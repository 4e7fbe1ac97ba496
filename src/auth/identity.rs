//! The contract with the identity provider that signs users in and out.

use std::future::Future;

use axum::http::StatusCode;
use time::Duration;
use tokio::sync::broadcast;

use crate::{
    UserID, ValidatedPassword,
    auth::{Session, SessionEvent, SessionId},
    user::{DisplayName, EmailAddress},
};

/// The errors an identity provider reports.
///
/// The `Display` text is the provider's raw message, use
/// [AuthError::friendly_message] for text suitable for the user.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum AuthError {
    /// The email and password did not match a registered user.
    #[error("Invalid login credentials")]
    InvalidCredentials,
    /// The user has not confirmed their email address yet.
    #[error("Email not confirmed")]
    EmailNotConfirmed,
    /// An account is already registered with the email address.
    #[error("User already registered")]
    UserAlreadyRegistered,
    /// The provider rejected the password as too weak.
    #[error("Password should be at least 6 characters")]
    WeakPassword,
    /// The provider rejected the email address.
    #[error("Unable to validate email address: invalid format")]
    InvalidEmail,
    /// The provider is not accepting new accounts.
    #[error("Signups not allowed for this instance")]
    SignUpDisabled,
    /// The session does not exist or has expired.
    #[error("Session not found")]
    SessionNotFound,
    /// Any other provider failure, with the provider's message.
    #[error("{0}")]
    Provider(String),
}

impl AuthError {
    /// The message to show the user for this error.
    pub fn friendly_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Invalid email or password. Please try again.",
            AuthError::EmailNotConfirmed => "Please confirm your email address before signing in.",
            AuthError::UserAlreadyRegistered => "An account with this email already exists.",
            AuthError::WeakPassword => "Password must be at least 6 characters long.",
            AuthError::InvalidEmail => "Please enter a valid email address.",
            AuthError::SignUpDisabled => "Account registration is currently disabled.",
            AuthError::SessionNotFound => "Your session has expired. Please sign in again.",
            AuthError::Provider(message) if !message.trim().is_empty() => return message.clone(),
            AuthError::Provider(_) => "An unexpected error occurred.",
        }
        .to_owned()
    }

    /// The HTTP status code that best describes the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials | AuthError::SessionNotFound => StatusCode::UNAUTHORIZED,
            AuthError::EmailNotConfirmed | AuthError::SignUpDisabled => StatusCode::FORBIDDEN,
            AuthError::UserAlreadyRegistered => StatusCode::CONFLICT,
            AuthError::WeakPassword | AuthError::InvalidEmail => StatusCode::BAD_REQUEST,
            AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// The details needed to register a new account.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    /// The address the user will sign in with.
    pub email: EmailAddress,
    /// The user's chosen password.
    pub password: ValidatedPassword,
    /// The name to store in the user's metadata.
    pub name: DisplayName,
}

/// The result of a successful registration.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    /// The ID of the new user.
    pub user_id: UserID,
    /// The new user's session, or `None` if they must confirm their email
    /// address before they can sign in.
    pub session: Option<Session>,
}

/// Issues and tracks sessions.
///
/// Every change to a session is also broadcast as a [SessionEvent] to the
/// receivers returned by [IdentityProvider::subscribe].
pub trait IdentityProvider {
    /// Get the session with `id` if it exists and has not expired.
    fn get_session(&self, id: SessionId) -> impl Future<Output = Option<Session>> + Send;

    /// Check the user's credentials and start a session lasting `duration`.
    fn sign_in(
        &self,
        email: &EmailAddress,
        password: &str,
        duration: Duration,
    ) -> impl Future<Output = Result<Session, AuthError>> + Send;

    /// Register a new user, signing them in if no email confirmation is needed.
    fn sign_up(
        &self,
        request: SignUp,
        duration: Duration,
    ) -> impl Future<Output = Result<SignUpOutcome, AuthError>> + Send;

    /// End the session with `id`.
    fn sign_out(&self, id: SessionId) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Push the session's expiry out to at least `duration` from now.
    ///
    /// Returns `None` if the session does not exist or has already expired.
    fn refresh_session(
        &self,
        id: SessionId,
        duration: Duration,
    ) -> impl Future<Output = Option<Session>> + Send;

    /// Replace the password of the user with `user_id`.
    fn update_password(
        &self,
        user_id: UserID,
        password: ValidatedPassword,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Listen for session changes.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::auth::AuthError;

    #[test]
    fn maps_provider_errors_to_friendly_messages() {
        let cases = [
            (
                AuthError::InvalidCredentials,
                "Invalid email or password. Please try again.",
            ),
            (
                AuthError::EmailNotConfirmed,
                "Please confirm your email address before signing in.",
            ),
            (
                AuthError::UserAlreadyRegistered,
                "An account with this email already exists.",
            ),
            (
                AuthError::WeakPassword,
                "Password must be at least 6 characters long.",
            ),
            (
                AuthError::InvalidEmail,
                "Please enter a valid email address.",
            ),
            (
                AuthError::SignUpDisabled,
                "Account registration is currently disabled.",
            ),
        ];

        for (error, want) in cases {
            assert_eq!(error.friendly_message(), want, "for {error:?}");
        }
    }

    #[test]
    fn unknown_errors_fall_back_to_provider_message() {
        assert_eq!(
            AuthError::Provider("rate limit exceeded".to_owned()).friendly_message(),
            "rate limit exceeded"
        );
        assert_eq!(
            AuthError::Provider(String::new()).friendly_message(),
            "An unexpected error occurred."
        );
    }

    #[test]
    fn invalid_credentials_are_unauthorized() {
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }
}
