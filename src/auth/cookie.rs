//! Defines functions for tracking the signed-in session with a private cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::auth::SessionId;

pub(crate) const COOKIE_SESSION: &str = "session";
/// The default duration for which sessions and their cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);
/// How long a session lasts if the user selects "remember me" at log-in.
pub const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// Add the session cookie to the cookie jar, expiring at `expires_at`.
///
/// Calling this again for the same session moves the cookie's expiry.
pub(crate) fn set_session_cookie(
    jar: PrivateCookieJar,
    session_id: SessionId,
    expires_at: OffsetDateTime,
) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, session_id.to_string()))
            .path("/")
            .expires(expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Set the session cookie to an invalid value and set its max age to zero,
/// which should delete the cookie on the client side.
pub(crate) fn invalidate_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Read the session ID from the cookie jar.
///
/// Returns `None` if the cookie is missing or does not hold a session ID.
pub(crate) fn get_session_id_from_cookies(jar: &PrivateCookieJar) -> Option<SessionId> {
    let cookie = jar.get(COOKIE_SESSION)?;

    match cookie.value().parse() {
        Ok(session_id) => Some(session_id),
        Err(error) => {
            tracing::debug!("Ignoring malformed session cookie: {error}");
            None
        }
    }
}
