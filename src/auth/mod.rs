//! Signing users up, in and out, and keeping track of their sessions.

mod cookie;
mod identity;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod register;
pub mod service;
mod session;

#[cfg(test)]
pub(crate) use cookie::COOKIE_SESSION;
pub use cookie::{DEFAULT_COOKIE_DURATION, REMEMBER_ME_COOKIE_DURATION};
pub use identity::{AuthError, IdentityProvider, SignUp, SignUpOutcome};
pub use log_in::{LogInData, SessionResponse, get_session_endpoint, post_log_in};
pub use log_out::post_log_out;
pub use middleware::auth_guard;
pub use password::{PasswordForm, update_password_endpoint};
pub use register::{CONFIRMATION_PENDING_MESSAGE, RegisterForm, register_user};
pub use session::{Session, SessionEvent, SessionId, SessionState};
