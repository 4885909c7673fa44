//! The user's preferred currency and the endpoint for changing it.

use std::{
    fmt::Display,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use rusqlite::{
    Connection,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, user::UserID};

/// A three character currency code such as "USD" or "EUR".
///
/// Only the length is checked. The code is not looked up in a currency registry
/// and is kept exactly as entered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// The currency for users that have not picked one.
    pub const DEFAULT: &str = "USD";

    /// Create a currency code.
    ///
    /// # Errors
    /// Returns [Error::InvalidInput] for the field `currency` if `code` is not
    /// exactly three characters long.
    pub fn new(code: &str) -> Result<Self, Error> {
        if code.chars().count() != 3 {
            return Err(Error::invalid_field(
                "currency",
                "must be exactly 3 characters",
            ));
        }

        Ok(Self(code.to_owned()))
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ToSql for CurrencyCode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for CurrencyCode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        CurrencyCode::new(value.as_str()?)
            .map_err(|error| FromSqlError::Other(error.to_string().into()))
    }
}

/// Set the preferred currency of the user `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user does not exist, or [Error::SqlError]
/// for any other SQL error.
pub fn update_currency(
    user_id: UserID,
    currency: &CurrencyCode,
    connection: &Connection,
) -> Result<CurrencyCode, Error> {
    connection
        .prepare("UPDATE user SET currency = :currency WHERE id = :id RETURNING currency")?
        .query_row(
            rusqlite::named_params! {":currency": currency, ":id": user_id.as_i64()},
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// The state needed to update a user's currency.
#[derive(Debug, Clone)]
pub struct CurrencyState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CurrencyState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body of a currency update request.
#[derive(Debug, Deserialize)]
pub struct CurrencyRequest {
    /// The new currency code.
    pub currency: String,
}

/// The body of a successful currency update.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CurrencyResponse {
    /// The stored currency code.
    pub currency: String,
}

/// A route handler for changing the logged in user's currency.
pub async fn update_currency_endpoint(
    State(state): State<CurrencyState>,
    Extension(user_id): Extension<UserID>,
    WithRejection(Json(request), _): WithRejection<Json<CurrencyRequest>, Error>,
) -> Result<impl IntoResponse, Error> {
    let currency = CurrencyCode::new(&request.currency)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let currency = update_currency(user_id, &currency, &connection)?;

    tracing::info!("User {user_id} changed their currency to {currency}");

    Ok(Json(CurrencyResponse {
        currency: currency.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use email_address::EmailAddress;
    use rusqlite::Connection;

    use crate::{
        Error,
        currency::{CurrencyCode, update_currency},
        db::initialize,
        user::{NewUser, UserID, create_user, get_user_by_id},
    };

    fn get_connection_with_user() -> (Connection, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_user(
            NewUser {
                name: None,
                email: EmailAddress::new_unchecked("a@example.com"),
                password_hash: None,
            },
            &conn,
        )
        .unwrap();

        (conn, user.id)
    }

    #[test]
    fn new_accepts_three_characters() {
        assert_eq!(CurrencyCode::new("EUR").unwrap().as_str(), "EUR");
        // Only the length is checked.
        assert_eq!(CurrencyCode::new("abc").unwrap().as_str(), "abc");
    }

    #[test]
    fn new_rejects_wrong_length() {
        assert!(matches!(CurrencyCode::new("EU"), Err(Error::InvalidInput(_))));
        assert!(matches!(CurrencyCode::new("EURO"), Err(Error::InvalidInput(_))));
        assert!(matches!(CurrencyCode::new(""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn default_is_usd() {
        assert_eq!(CurrencyCode::default().as_str(), "USD");
    }

    #[test]
    fn update_currency_persists() {
        let (conn, user_id) = get_connection_with_user();
        let eur = CurrencyCode::new("EUR").unwrap();

        let got = update_currency(user_id, &eur, &conn).unwrap();

        assert_eq!(got, eur);
        assert_eq!(get_user_by_id(user_id, &conn).unwrap().currency, eur);
    }

    #[test]
    fn update_currency_fails_for_missing_user() {
        let (conn, _) = get_connection_with_user();
        let eur = CurrencyCode::new("EUR").unwrap();

        assert_eq!(
            update_currency(UserID::new(999), &eur, &conn),
            Err(Error::NotFound)
        );
    }
}
