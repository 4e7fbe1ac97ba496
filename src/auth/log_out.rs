use axum::{extract::State, http::StatusCode};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    AppState, Error,
    auth::{
        IdentityProvider,
        cookie::{get_session_id_from_cookies, invalidate_session_cookie},
        service,
    },
};

/// Handler for log-out requests via the POST method.
///
/// Ends the session, drops its workspace and invalidates the session cookie.
/// Logging out without a session is not an error.
///
/// # Errors
///
/// Returns an [Error::Auth] if the identity provider could not end the session.
pub async fn post_log_out(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, StatusCode), Error> {
    if let Some(session_id) = get_session_id_from_cookies(&jar) {
        if let Some(session) = state.backend.get_session(session_id).await {
            service::sign_out(&state.backend, &state.backend, &session).await?;
        }

        state.workspaces.remove(session_id);
    }

    Ok((invalidate_session_cookie(jar), StatusCode::NO_CONTENT))
}
