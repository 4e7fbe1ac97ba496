//! Sessions issued by the identity provider and the per-client session state.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    UserID,
    profile::{Profile, ProfileService, load_or_create_profile},
    user::EmailAddress,
};

/// An opaque identifier for a signed-in session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The session's ID, stored in the client's cookie.
    pub id: SessionId,
    /// The signed-in user.
    pub user_id: UserID,
    /// The signed-in user's email address.
    pub email: EmailAddress,
    /// The name the user registered with.
    pub name: String,
    /// When the session stops being valid unless it is refreshed.
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Whether the session has expired at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}

/// A change in session state broadcast by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A user signed in and was issued the session.
    SignedIn(Session),
    /// The session's expiry was extended.
    TokenRefreshed(Session),
    /// The session was ended by the user.
    SignedOut(SessionId),
    /// The session ran past its expiry and was discarded.
    Expired(SessionId),
}

impl SessionEvent {
    /// The ID of the session the event is about.
    pub fn session_id(&self) -> SessionId {
        match self {
            SessionEvent::SignedIn(session) | SessionEvent::TokenRefreshed(session) => session.id,
            SessionEvent::SignedOut(id) | SessionEvent::Expired(id) => *id,
        }
    }
}

/// What one client knows about who is signed in.
///
/// Owned by the client's workspace and updated by applying the
/// [SessionEvent]s the identity provider broadcasts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    session: Option<Session>,
    profile: Option<Profile>,
}

impl SessionState {
    /// A state with nobody signed in.
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// The current session, if a user is signed in.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The signed-in user's ID.
    pub fn user_id(&self) -> Option<UserID> {
        self.session.as_ref().map(|session| session.user_id)
    }

    /// The signed-in user's profile, if it could be loaded.
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Replace the cached profile, e.g. after the user edits it.
    pub fn set_profile(&mut self, profile: Profile) {
        self.profile = Some(profile);
    }

    /// Update the state from an identity provider event.
    ///
    /// Signing in loads the user's profile, creating it first if the user
    /// does not have one yet. Events for other sessions are ignored, except
    /// for sign-ins which always replace the current session.
    pub async fn apply<P: ProfileService>(&mut self, event: SessionEvent, profiles: &P) {
        match event {
            SessionEvent::SignedIn(session) => {
                let user_changed = self.user_id() != Some(session.user_id);
                if user_changed || self.profile.is_none() {
                    self.profile = load_or_create_profile(&session, profiles).await;
                }
                self.session = Some(session);
            }
            SessionEvent::TokenRefreshed(session) => self.refresh(session),
            SessionEvent::SignedOut(id) | SessionEvent::Expired(id) => self.end(id),
        }
    }

    /// Replace the current session with a refreshed copy of itself.
    pub fn refresh(&mut self, session: Session) {
        if self.is_current(session.id) {
            self.session = Some(session);
        }
    }

    /// Forget the session with `id` and its profile if it is the current one.
    pub fn end(&mut self, id: SessionId) {
        if self.is_current(id) {
            self.session = None;
            self.profile = None;
        }
    }

    fn is_current(&self, id: SessionId) -> bool {
        self.session.as_ref().map(|current| current.id) == Some(id)
    }
}
