//! Authentication middleware that resolves the session cookie, opens the
//! session's workspace and extends the session.

use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    AppState, Error,
    auth::{
        IdentityProvider,
        cookie::{get_session_id_from_cookies, invalidate_session_cookie, set_session_cookie},
    },
    workspace::Workspace,
};

/// Middleware function that checks for a valid session cookie.
///
/// On success the [Session](crate::auth::Session) and the session's
/// [WorkspaceHandle](crate::workspace::WorkspaceHandle) are placed into the
/// request, the request is executed, and the session and its cookie are
/// extended by the app's cookie duration. Otherwise a 401 response is returned.
///
/// **Note**: Route handlers can use the function arguments `Extension(session): Extension<Session>`
/// and `Extension(workspace): Extension<WorkspaceHandle>` to receive them.
pub async fn auth_guard(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(session_id) = get_session_id_from_cookies(&jar) else {
        return Error::Unauthenticated.into_response();
    };

    let Some(session) = state.backend.get_session(session_id).await else {
        tracing::debug!("Session {session_id} is unknown or expired");
        state.workspaces.remove(session_id);
        return (invalidate_session_cookie(jar), Error::Unauthenticated).into_response();
    };

    let workspace = match state.workspaces.get(session.id) {
        Some(workspace) => workspace,
        None => {
            let client = state.backend.client(session.user_id);
            let workspace = Workspace::open(session.clone(), &client).await;

            match state
                .workspaces
                .insert_live(&state.backend, session.id, workspace)
                .await
            {
                Some(workspace) => workspace,
                None => {
                    return (invalidate_session_cookie(jar), Error::Unauthenticated)
                        .into_response();
                }
            }
        }
    };

    request.extensions_mut().insert(session.clone());
    request.extensions_mut().insert(workspace);
    let response = next.run(request).await;

    // `None` if the session ended while the request was being handled.
    let Some(refreshed) = state
        .backend
        .refresh_session(session.id, state.cookie_duration)
        .await
    else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let jar = set_session_cookie(jar, refreshed.id, refreshed.expires_at);
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}
