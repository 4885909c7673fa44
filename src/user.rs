//! Code for creating the user table, fetching users from the database and
//! showing a user their own profile.

use std::{
    fmt::Display,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use email_address::EmailAddress;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, currency::CurrencyCode, password::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user goes by, if they gave one.
    pub name: Option<String>,
    /// The user's email address. Unique across all users.
    pub email: EmailAddress,
    /// The user's password hash.
    ///
    /// Users that only sign in through the identity provider have no password.
    pub password_hash: Option<PasswordHash>,
    /// The currency the user's amounts are in.
    pub currency: CurrencyCode,
}

/// The data needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The display name, if the user gave one.
    pub name: Option<String>,
    /// The email address the user signs in with.
    pub email: EmailAddress,
    /// The hash of the user's password, `None` for federated-only users.
    pub password_hash: Option<PasswordHash>,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT,
                email TEXT UNIQUE NOT NULL,
                password TEXT,
                currency TEXT NOT NULL DEFAULT 'USD'
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// New users start with the default currency.
///
/// # Errors
///
/// Returns a [Error::DuplicateEmail] if the email is already taken, or
/// [Error::SqlError] if another SQL related error occurred.
pub fn create_user(user: NewUser, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "INSERT INTO user (name, email, password) VALUES (:name, :email, :password)
            RETURNING id, name, email, password, currency",
        )?
        .query_row(
            rusqlite::named_params! {
                ":name": user.name,
                ":email": user.email.as_str(),
                ":password": user.password_hash.as_ref().map(ToString::to_string),
            },
            map_user_row,
        )
        .map_err(Error::from)
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare("SELECT id, name, email, password, currency FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user registered with `email`, or `None` if there is no such user.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn get_user_by_email(email: &str, db_connection: &Connection) -> Result<Option<User>, Error> {
    db_connection
        .prepare("SELECT id, name, email, password, currency FROM user WHERE email = :email")?
        .query_row(&[(":email", &email)], map_user_row)
        .optional()
        .map_err(|error| error.into())
}

/// Set the password hash of the user registered with `email`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that email, or [Error::SqlError]
/// if another SQL related error occurred.
pub fn update_password(
    email: &str,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE email = ?2",
        (password_hash.as_ref(), email),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
#[cfg(test)]
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get::<_, i64>(0))
        .map(|count| usize::try_from(count).unwrap_or_default())
        .map_err(|error| error.into())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let id = UserID::new(row.get(0)?);
    let name = row.get(1)?;
    let raw_email: String = row.get(2)?;
    let raw_password_hash: Option<String> = row.get(3)?;
    let currency = row.get(4)?;

    Ok(User {
        id,
        name,
        email: EmailAddress::new_unchecked(raw_email),
        password_hash: raw_password_hash.as_deref().map(PasswordHash::new_unchecked),
        currency,
    })
}

/// What a user sees about themselves.
///
/// The password hash is never sent to clients.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub currency: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_i64(),
            name: user.name.clone(),
            email: user.email.to_string(),
            currency: user.currency.to_string(),
        }
    }
}

/// The state needed to look up the current user.
#[derive(Debug, Clone)]
pub struct UserState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns the profile of the logged in user.
pub async fn get_user_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserID>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let user = get_user_by_id(user_id, &connection)?;

    Ok(Json(UserProfile::from(&user)))
}
