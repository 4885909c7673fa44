//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{
        HeaderMap, Uri,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::Error;

/// The number of bytes of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

const REDACTED: &str = "********";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// Password fields and identity assertions are redacted and cookies are
/// never logged.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let method = parts.method.clone();
    let uri = loggable_uri(&parts.uri);

    let Ok(body_bytes) = axum::body::to_bytes(body, usize::MAX).await else {
        tracing::warn!("Could not read the body of {method} {uri}");
        return Error::invalid_field("body", "could not read the request body").into_response();
    };

    let body_text = redact_body(&parts.headers, &body_bytes);
    tracing::info!(
        "Received request: {method} {uri}\nheaders: {:?}\nbody: {}",
        loggable_headers(&parts.headers),
        preview(&body_text)
    );
    log_full_body("request", &body_text);

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let Ok(body_bytes) = axum::body::to_bytes(body, usize::MAX).await else {
        tracing::error!("Could not read the response body for {method} {uri}");
        return Response::from_parts(parts, Body::empty());
    };

    let body_text = redact_body(&parts.headers, &body_bytes);
    tracing::info!(
        "Sending response to {method} {uri}: {}\nheaders: {:?}\nbody: {}",
        parts.status,
        loggable_headers(&parts.headers),
        preview(&body_text)
    );
    log_full_body("response", &body_text);

    Response::from_parts(parts, Body::from(body_bytes))
}

/// The path and query of `uri` with the identity assertion replaced.
pub fn loggable_uri(uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}?{}", uri.path(), redact_form(query, "id_token")),
        None => uri.path().to_owned(),
    }
}

/// The headers as (name, value) pairs without the cookie headers.
fn loggable_headers(headers: &HeaderMap) -> Vec<(&str, &str)> {
    headers
        .iter()
        .filter(|(name, _)| **name != COOKIE && **name != SET_COOKIE)
        .map(|(name, value)| (name.as_str(), value.to_str().unwrap_or("<binary>")))
        .collect()
}

/// The body as text with any password fields replaced.
fn redact_body(headers: &HeaderMap, body: &Bytes) -> String {
    let text = String::from_utf8_lossy(body);
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/json") {
        redact_json(&text)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        redact_form(&text, "password")
    } else {
        text.into_owned()
    }
}

fn redact_json(text: &str) -> String {
    let Ok(mut value) = serde_json::from_str::<serde_json::Value>(text) else {
        return text.to_owned();
    };

    redact_json_value(&mut value);

    value.to_string()
}

fn redact_json_value(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                if key == "password" {
                    *value = serde_json::Value::String(REDACTED.to_owned());
                } else {
                    redact_json_value(value);
                }
            }
        }
        serde_json::Value::Array(values) => values.iter_mut().for_each(redact_json_value),
        _ => {}
    }
}

fn redact_form(form_text: &str, field_name: &str) -> String {
    form_text
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if name == field_name => format!("{name}={REDACTED}"),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn preview(body: &str) -> String {
    if body.len() <= LOG_BODY_LENGTH_LIMIT {
        return format!("{body:?}");
    }

    let mut end = LOG_BODY_LENGTH_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    format!("{:?}...", &body[..end])
}

fn log_full_body(kind: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::debug!("Full {kind} body: {body:?}");
    }
}
