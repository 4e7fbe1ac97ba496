use std::cmp::max;

use time::{Duration, OffsetDateTime};
use tokio::sync::broadcast;

use crate::{
    Error, PasswordHash, UserID, ValidatedPassword,
    auth::{AuthError, IdentityProvider, Session, SessionEvent, SessionId, SignUp, SignUpOutcome},
    backend::SqliteBackend,
    user::{EmailAddress, User, create_user, get_user_by_email, update_password_hash},
};

impl SqliteBackend {
    fn start_session(&self, user: &User, duration: Duration) -> Session {
        let session = Session {
            id: SessionId::new_random(),
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            expires_at: OffsetDateTime::now_utc() + duration,
        };

        self.lock_sessions().insert(session.id, session.clone());
        self.broadcast(SessionEvent::SignedIn(session.clone()));

        session
    }
}

fn provider_error(error: Error) -> AuthError {
    tracing::error!("Identity provider error: {error}");
    AuthError::Provider("The account service is unavailable, please try again later.".to_owned())
}

impl IdentityProvider for SqliteBackend {
    async fn get_session(&self, id: SessionId) -> Option<Session> {
        let mut sessions = self.lock_sessions();
        let session = sessions.get(&id)?;

        if session.is_expired_at(OffsetDateTime::now_utc()) {
            sessions.remove(&id);
            drop(sessions);
            self.broadcast(SessionEvent::Expired(id));
            return None;
        }

        Some(session.clone())
    }

    async fn sign_in(
        &self,
        email: &EmailAddress,
        password: &str,
        duration: Duration,
    ) -> Result<Session, AuthError> {
        let user = {
            let connection = self.lock_connection().map_err(provider_error)?;

            match get_user_by_email(email, &connection) {
                Ok(user) => user,
                Err(Error::NotFound) => return Err(AuthError::InvalidCredentials),
                Err(error) => return Err(provider_error(error)),
            }
        };

        match user.password_hash.verify(password) {
            Ok(true) => Ok(self.start_session(&user, duration)),
            Ok(false) => Err(AuthError::InvalidCredentials),
            Err(error) => Err(provider_error(Error::HashingError(error.to_string()))),
        }
    }

    async fn sign_up(
        &self,
        request: SignUp,
        duration: Duration,
    ) -> Result<SignUpOutcome, AuthError> {
        let password_hash =
            PasswordHash::new(request.password, self.password_cost).map_err(provider_error)?;

        let user = {
            let connection = self.lock_connection().map_err(provider_error)?;

            match create_user(
                &request.email,
                request.name.as_ref(),
                password_hash,
                &connection,
            ) {
                Ok(user) => user,
                Err(Error::DuplicateEmail) => return Err(AuthError::UserAlreadyRegistered),
                Err(error) => return Err(provider_error(error)),
            }
        };

        Ok(SignUpOutcome {
            user_id: user.id,
            session: Some(self.start_session(&user, duration)),
        })
    }

    async fn sign_out(&self, id: SessionId) -> Result<(), AuthError> {
        let removed = self.lock_sessions().remove(&id);

        if removed.is_some() {
            self.broadcast(SessionEvent::SignedOut(id));
        }

        Ok(())
    }

    async fn refresh_session(&self, id: SessionId, duration: Duration) -> Option<Session> {
        let session = self.get_session(id).await?;
        let expires_at = max(session.expires_at, OffsetDateTime::now_utc() + duration);

        if expires_at == session.expires_at {
            return Some(session);
        }

        let refreshed = Session {
            expires_at,
            ..session
        };
        self.lock_sessions().insert(id, refreshed.clone());
        self.broadcast(SessionEvent::TokenRefreshed(refreshed.clone()));

        Some(refreshed)
    }

    async fn update_password(
        &self,
        user_id: UserID,
        password: ValidatedPassword,
    ) -> Result<(), AuthError> {
        let password_hash =
            PasswordHash::new(password, self.password_cost).map_err(provider_error)?;
        let connection = self.lock_connection().map_err(provider_error)?;

        update_password_hash(user_id, &password_hash, &connection).map_err(provider_error)
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}
