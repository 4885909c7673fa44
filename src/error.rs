//! Defines the app level error type and its conversion to JSON error responses.
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// A problem with a single field of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// The name of the offending field as it appears in the request.
    pub field: &'static str,
    /// A human readable explanation of what is wrong with the field.
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request does not carry a valid session.
    #[error("unauthorized")]
    Unauthorized,

    /// The credentials did not identify a user.
    ///
    /// This is used for unknown emails, accounts without a password and wrong
    /// passwords alike so that callers cannot tell these cases apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// One or more fields of the request failed validation.
    #[error("invalid input: {0:?}")]
    InvalidInput(Vec<FieldError>),

    /// The requested resource was not found.
    ///
    /// Resources owned by another user are reported as not found too.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The email address is already registered to another user.
    #[error("the email address is already in use")]
    DuplicateEmail,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A date-time could not be formatted for storage or for a cookie.
    #[error("could not format date-time: {0}")]
    TimeFormat(String),

    /// The sum of a user's transactions does not fit in a decimal.
    #[error("the transaction total overflowed")]
    AmountOverflow,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Federated sign-in could not be started, e.g. the authorize URL could
    /// not be built.
    #[error("federated sign-in is unavailable: {0}")]
    FederationUnavailable(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl Error {
    /// Shortcut for an [Error::InvalidInput] with a single field.
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Error::InvalidInput(vec![FieldError::new(field, message)])
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::invalid_field("body", rejection.body_text())
    }
}

/// The JSON body sent to the client for every failed request.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, kind, message, fields) = match self {
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "Unauthorized".to_owned(),
                Vec::new(),
            ),
            Error::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "InvalidCredentials",
                "Incorrect email or password.".to_owned(),
                Vec::new(),
            ),
            Error::InvalidInput(fields) => (
                StatusCode::BAD_REQUEST,
                "InvalidInput",
                "The request contained invalid data.".to_owned(),
                fields,
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                "NotFound",
                "The requested resource could not be found.".to_owned(),
                Vec::new(),
            ),
            Error::DuplicateEmail => (
                StatusCode::CONFLICT,
                "Conflict",
                "The email address is already in use.".to_owned(),
                Vec::new(),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    "An unexpected error occurred, check the server logs for more details."
                        .to_owned(),
                    Vec::new(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                error: kind,
                message,
                fields,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;

    use super::{Error, FieldError};

    async fn body_json(error: Error) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Could not get response body");

        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn unauthorized_has_no_detail() {
        let (status, body) = body_json(Error::Unauthorized).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            body,
            serde_json::json!({"error": "Unauthorized", "message": "Unauthorized"})
        );
    }

    #[tokio::test]
    async fn invalid_input_lists_fields() {
        let (status, body) = body_json(Error::InvalidInput(vec![
            FieldError::new("amount", "must be positive"),
            FieldError::new("category", "must not be empty"),
        ]))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidInput");
        assert_eq!(body["fields"][0]["field"], "amount");
        assert_eq!(body["fields"][1]["field"], "category");
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let (status, body) = body_json(Error::DuplicateEmail).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Conflict");
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) = body_json(Error::HashingError("secret detail".to_owned())).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "InternalError");
        assert!(!body["message"].as_str().unwrap().contains("secret detail"));
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let conn = Connection::open_in_memory().unwrap();

        let error: Error = conn
            .query_row("SELECT 1 WHERE 0", [], |row| row.get::<_, i64>(0))
            .unwrap_err()
            .into();

        assert_eq!(error, Error::NotFound);
    }
}
