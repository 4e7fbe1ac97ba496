//! Route handlers for signing in and for reading the signed-in session.

use axum::{Extension, Json, extract::State};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    AppState, Error, UserID,
    auth::{REMEMBER_ME_COOKIE_DURATION, Session, cookie::set_session_cookie, service},
    profile::Profile,
    user::EmailAddress,
    workspace::{Workspace, WorkspaceHandle},
};

/// The signed-in user as sent to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    /// The signed-in user.
    pub user_id: UserID,
    /// The signed-in user's email address.
    pub email: EmailAddress,
    /// The name the user registered with.
    pub name: String,
    /// When the session ends unless the user keeps using the app.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// The user's profile, `None` if it could not be loaded.
    pub profile: Option<Profile>,
}

impl SessionResponse {
    pub(crate) fn new(session: &Session, profile: Option<Profile>) -> Self {
        Self {
            user_id: session.user_id,
            email: session.email.clone(),
            name: session.name.clone(),
            expires_at: session.expires_at,
            profile,
        }
    }
}

/// The data for a log-in request.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
    /// Whether to keep the user signed in for a week instead of the usual session length.
    #[serde(default)]
    pub remember_me: bool,
}

/// Sign in `session`'s user: open a fresh workspace and set the session cookie.
///
/// Shared by log-in and sign-up.
pub(crate) async fn start_session(
    state: &AppState,
    jar: PrivateCookieJar,
    session: Session,
) -> (PrivateCookieJar, Json<SessionResponse>) {
    let client = state.backend.client(session.user_id);
    let workspace = Workspace::open(session.clone(), &client).await;
    let response = SessionResponse::new(&session, workspace.session.profile().cloned());

    // The next request is turned away by the auth guard.
    if state
        .workspaces
        .insert_live(&state.backend, session.id, workspace)
        .await
        .is_none()
    {
        tracing::debug!("Session {} ended before it was handed out", session.id);
    }

    (
        set_session_cookie(jar, session.id, session.expires_at),
        Json(response),
    )
}

/// Handler for log-in requests via the POST method.
///
/// On success the session cookie is set and the signed-in user and their
/// profile are returned.
///
/// # Errors
///
/// Returns an [Error::InvalidEmail] if the email is malformed, or an
/// [Error::Auth] if the identity provider rejected the credentials.
pub async fn post_log_in(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(user_data): Json<LogInData>,
) -> Result<(PrivateCookieJar, Json<SessionResponse>), Error> {
    let email = EmailAddress::new(&user_data.email)?;
    let duration = if user_data.remember_me {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let session = service::sign_in(
        &state.backend,
        &state.backend,
        &email,
        &user_data.password,
        duration,
    )
    .await?;

    Ok(start_session(&state, jar, session).await)
}

/// A route handler for the signed-in user and their profile.
pub async fn get_session_endpoint(
    Extension(session): Extension<Session>,
    Extension(workspace): Extension<WorkspaceHandle>,
) -> Json<SessionResponse> {
    let workspace = workspace.lock().await;

    Json(SessionResponse::new(
        &session,
        workspace.session.profile().cloned(),
    ))
}
