//! Sign-up, sign-in, sign-out and password changes with their audit trail.

use serde_json::json;
use time::Duration;

use crate::{
    Error, UserID, ValidatedPassword,
    audit::{AuditAction, AuditEvent, AuditSink},
    auth::{IdentityProvider, Session, SignUp, SignUpOutcome},
    user::EmailAddress,
};

const AUTH_TABLE: &str = "auth";

/// Register a new account and record the attempt.
///
/// # Errors
///
/// Returns an [Error::Auth] if the identity provider rejected the request.
pub async fn sign_up<I, A>(
    identity: &I,
    audit: &A,
    request: SignUp,
    duration: Duration,
) -> Result<SignUpOutcome, Error>
where
    I: IdentityProvider,
    A: AuditSink,
{
    let email = request.email.clone();

    match identity.sign_up(request, duration).await {
        Ok(outcome) => {
            tracing::info!("Registered user {}", outcome.user_id);
            audit
                .log_event(
                    AuditEvent::new(AuditAction::SignUpSuccess)
                        .table(AUTH_TABLE)
                        .user(outcome.user_id)
                        .new_values(json!({ "email": email })),
                )
                .await;
            Ok(outcome)
        }
        Err(error) => {
            tracing::warn!("Sign up failed for {email}: {error}");
            audit
                .log_event(
                    AuditEvent::new(AuditAction::SignUpFailed)
                        .table(AUTH_TABLE)
                        .new_values(json!({ "email": email, "error": error.to_string() })),
                )
                .await;
            Err(error.into())
        }
    }
}

/// Sign a user in with their email and password and record the attempt.
///
/// # Errors
///
/// Returns an [Error::Auth] if the credentials were rejected.
pub async fn sign_in<I, A>(
    identity: &I,
    audit: &A,
    email: &EmailAddress,
    password: &str,
    duration: Duration,
) -> Result<Session, Error>
where
    I: IdentityProvider,
    A: AuditSink,
{
    match identity.sign_in(email, password, duration).await {
        Ok(session) => {
            audit
                .log_event(
                    AuditEvent::new(AuditAction::SignInSuccess)
                        .table(AUTH_TABLE)
                        .user(session.user_id)
                        .new_values(json!({ "email": email })),
                )
                .await;
            Ok(session)
        }
        Err(error) => {
            tracing::warn!("Sign in failed for {email}: {error}");
            audit
                .log_event(
                    AuditEvent::new(AuditAction::SignInFailed)
                        .table(AUTH_TABLE)
                        .new_values(json!({ "email": email, "error": error.to_string() })),
                )
                .await;
            Err(error.into())
        }
    }
}

/// End `session` and record it.
///
/// # Errors
///
/// Returns an [Error::Auth] if the identity provider could not end the session.
pub async fn sign_out<I, A>(identity: &I, audit: &A, session: &Session) -> Result<(), Error>
where
    I: IdentityProvider,
    A: AuditSink,
{
    identity.sign_out(session.id).await?;

    audit
        .log_event(
            AuditEvent::new(AuditAction::SignOutSuccess)
                .table(AUTH_TABLE)
                .user(session.user_id),
        )
        .await;

    Ok(())
}

/// Change the password of the user with `user_id` and record it.
///
/// # Errors
///
/// Returns an [Error::Auth] if the identity provider rejected the new password.
pub async fn update_password<I, A>(
    identity: &I,
    audit: &A,
    user_id: UserID,
    password: ValidatedPassword,
) -> Result<(), Error>
where
    I: IdentityProvider,
    A: AuditSink,
{
    identity.update_password(user_id, password).await?;

    audit
        .log_event(
            AuditEvent::new(AuditAction::PasswordUpdated)
                .table(AUTH_TABLE)
                .user(user_id),
        )
        .await;

    Ok(())
}
