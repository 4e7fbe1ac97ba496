//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Bodies longer than this many bytes are truncated in the `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest request or response body the middleware will buffer, in bytes.
///
/// Matches axum's default request body limit.
pub const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

const REDACTED_FIELDS: [&str; 2] = ["password", "confirm_password"];
const REDACTED: &str = "********";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the response body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// Passwords in JSON request bodies are never logged.
///
/// Bodies are passed on byte for byte. A request body larger than
/// [MAX_BODY_SIZE] is rejected with a 413 response.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (headers, body) = match extract_header_and_body_from_request(request).await {
        Ok(parts) => parts,
        Err(error) => {
            tracing::warn!("Could not read request body: {error}");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let is_json = headers
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    let body_text = String::from_utf8_lossy(&body);
    if is_json {
        log_request(&headers, &redact_passwords(&body_text));
    } else {
        log_request(&headers, &body_text);
    }

    let request = Request::from_parts(headers, Body::from(body));
    let response = next.run(request).await;

    let (headers, body) = match extract_header_and_body_from_response(response).await {
        Ok(parts) => parts,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    log_response(&headers, &String::from_utf8_lossy(&body));

    Response::from_parts(headers, Body::from(body))
}

/// Replace the password fields of a JSON object with asterisks.
///
/// Text that is not a JSON object is returned as is.
fn redact_passwords(json_text: &str) -> String {
    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(json_text) else {
        return json_text.to_owned();
    };

    for field in REDACTED_FIELDS {
        if let Some(value) = object.get_mut(field) {
            *value = Value::String(REDACTED.to_owned());
        }
    }

    Value::Object(object).to_string()
}

async fn extract_header_and_body_from_request(
    request: Request,
) -> Result<(axum::http::request::Parts, Bytes), axum::Error> {
    let (headers, body) = request.into_parts();
    let body = axum::body::to_bytes(body, MAX_BODY_SIZE).await?;

    Ok((headers, body))
}

async fn extract_header_and_body_from_response(
    response: Response,
) -> Result<(axum::http::response::Parts, Bytes), axum::Error> {
    let (headers, body) = response.into_parts();
    let body = axum::body::to_bytes(body, MAX_BODY_SIZE).await?;

    Ok((headers, body))
}

/// The first [LOG_BODY_LENGTH_LIMIT] bytes of `body`, cut back to a character boundary.
fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(headers: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {headers:#?}\nbody: {:}...",
            truncate(body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {headers:#?}\nbody: {body:?}");
    }
}

fn log_response(headers: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {headers:#?}\nbody: {:}...",
            truncate(body)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {headers:#?}\nbody: {body:?}");
    }
}
