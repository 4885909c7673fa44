//! The endpoint for recording a new transaction.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    date_time::parse_client_date_time,
    error::FieldError,
    money::Amount,
    user::UserID,
};

use super::{
    core::{Transaction, TransactionBuilder, TransactionKind, create_transaction},
    view::TransactionResponse,
};

/// The state needed for creating a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a request to create a transaction.
///
/// Fields are loosely typed so that every problem with the request can be
/// reported at once instead of only the first.
#[derive(Debug, Default, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub amount: Option<serde_json::Value>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
}

impl CreateTransactionRequest {
    /// Check every field and turn the request into a [TransactionBuilder].
    ///
    /// # Errors
    /// Returns [Error::InvalidInput] listing each invalid field.
    pub fn validate(self) -> Result<TransactionBuilder, Error> {
        let mut errors = Vec::new();

        let kind = match self.kind.as_deref() {
            None => {
                errors.push(FieldError::new("type", "is required"));
                None
            }
            Some(raw_kind) => match raw_kind.parse::<TransactionKind>() {
                Ok(kind) => Some(kind),
                Err(error) => {
                    errors.push(FieldError::new("type", error.to_string()));
                    None
                }
            },
        };

        let amount = match self.amount {
            None | Some(serde_json::Value::Null) => {
                errors.push(FieldError::new("amount", "is required"));
                None
            }
            Some(serde_json::Value::Number(number)) => {
                match number.as_f64().map(Amount::from_f64) {
                    Some(Ok(amount)) => Some(amount),
                    Some(Err(Error::InvalidInput(field_errors))) => {
                        errors.extend(field_errors);
                        None
                    }
                    Some(Err(error)) => return Err(error),
                    None => {
                        errors.push(FieldError::new("amount", "must be a number"));
                        None
                    }
                }
            }
            Some(_) => {
                errors.push(FieldError::new("amount", "must be a number"));
                None
            }
        };

        let description = check_not_blank("description", self.description, &mut errors);
        let category = check_not_blank("category", self.category, &mut errors);

        let date = match self.date.as_deref() {
            None => None,
            Some(raw_date) => {
                let date = parse_client_date_time(raw_date);

                if date.is_none() {
                    errors.push(FieldError::new(
                        "date",
                        "must be an ISO 8601 date or date-time",
                    ));
                }

                date
            }
        };

        match (kind, amount, description, category) {
            (Some(kind), Some(amount), Some(description), Some(category)) if errors.is_empty() => {
                Ok(Transaction::build(kind, amount, &description, &category).date(date))
            }
            _ => Err(Error::InvalidInput(errors)),
        }
    }
}

fn check_not_blank(
    field: &'static str,
    value: Option<String>,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Some(text),
        Some(_) => {
            errors.push(FieldError::new(field, "must not be empty"));
            None
        }
        None => {
            errors.push(FieldError::new(field, "is required"));
            None
        }
    }
}

/// A route handler for creating a new transaction for the logged in user.
///
/// Responds with 201 and the stored transaction.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(user_id): Extension<UserID>,
    WithRejection(Json(request), _): WithRejection<Json<CreateTransactionRequest>, Error>,
) -> Result<impl IntoResponse, Error> {
    let builder = request.validate()?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let transaction = create_transaction(user_id, builder, &connection)?;

    tracing::debug!("User {user_id} created transaction {}", transaction.id);

    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse::from(transaction)),
    ))
}
