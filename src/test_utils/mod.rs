#![allow(missing_docs)]

use axum::http::StatusCode;
use axum_extra::extract::cookie::Cookie;
use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::json;
use time::Duration;

use crate::{AppState, auth::COOKIE_SESSION, backend::SqliteBackend, build_router, endpoints};

pub(crate) const TEST_PASSWORD: &str = "correct horse";

/// App state on an in-memory database with a cheap password hash.
pub(crate) fn create_test_app_state() -> AppState {
    let backend = SqliteBackend::new(Connection::open_in_memory().unwrap())
        .unwrap()
        .with_password_cost(4);

    AppState::with_backend(backend, "a test secret", Duration::minutes(5))
}

pub(crate) fn create_test_server() -> TestServer {
    TestServer::new(build_router(create_test_app_state()))
}

/// Register an account with [TEST_PASSWORD] and return its session cookie.
pub(crate) async fn sign_up(server: &TestServer, email: &str) -> Cookie<'static> {
    let response = server
        .post(endpoints::SIGN_UP)
        .json(&json!({
            "name": "Test User",
            "email": email,
            "password": TEST_PASSWORD,
            "confirm_password": TEST_PASSWORD,
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    response.cookie(COOKIE_SESSION)
}
