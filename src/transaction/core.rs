//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::TransactionId,
    date_time::{get_date_time_column, now_utc, to_storage_string},
    money::Amount,
    user::UserID,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// The name of the kind as it is sent to and received from clients.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned when a string is not a [TransactionKind].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a transaction type, expected INCOME or EXPENSE")]
pub struct UnknownTransactionKind(pub String);

impl FromStr for TransactionKind {
    type Err = UnknownTransactionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOME" => Ok(TransactionKind::Income),
            "EXPENSE" => Ok(TransactionKind::Expense),
            other => Err(UnknownTransactionKind(other.to_owned())),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that recorded the transaction.
    pub user_id: UserID,
    /// Whether the money was earned or spent.
    pub kind: TransactionKind,
    /// How much money was earned or spent, in the owner's currency.
    pub amount: Amount,
    /// A text description of what the transaction was for.
    pub description: String,
    /// A free form label such as "Groceries" or "Salary".
    pub category: String,
    /// When the transaction happened.
    pub date: OffsetDateTime,
    /// When the transaction was recorded.
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        kind: TransactionKind,
        amount: Amount,
        description: &str,
        category: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            kind,
            amount,
            description: description.to_owned(),
            category: category.to_owned(),
            date: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// # Examples
///
/// ```ignore
/// use rust_decimal_macros::dec;
/// use time::macros::datetime;
///
/// use crate::{money::Amount, transaction::{Transaction, TransactionKind}};
///
/// let builder = Transaction::build(
///         TransactionKind::Expense,
///         Amount::new(dec!(45.99)).unwrap(),
///         "Coffee beans",
///         "Groceries",
///     )
///     .date(Some(datetime!(2025-01-15 09:30 UTC)));
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// Whether the money was earned or spent.
    pub kind: TransactionKind,

    /// How much money moved. Always positive, the direction is given by `kind`.
    pub amount: Amount,

    /// A human-readable description of the transaction.
    ///
    /// # Examples
    /// - `"Salary - January 2025"`
    /// - `"Weekly shop"`
    pub description: String,

    /// The category of the transaction, e.g. "Groceries", "Transport", "Rent".
    pub category: String,

    /// The date when the transaction occurred.
    ///
    /// Defaults to the time the transaction is recorded if not specified.
    pub date: Option<OffsetDateTime>,
}

impl TransactionBuilder {
    /// Set the date the transaction happened on.
    pub fn date(mut self, date: Option<OffsetDateTime>) -> Self {
        self.date = date;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new transaction owned by `owner` in the database from a builder.
///
/// The creation time is set to now, as is the transaction date if the builder
/// does not have one.
///
/// # Errors
/// This function will return a:
/// - [Error::TimeFormat] if a date cannot be formatted for storage,
/// - or [Error::SqlError] if there is some other SQL error, including when
///   `owner` does not refer to a user.
pub fn create_transaction(
    owner: UserID,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let created_at = now_utc();
    let date = builder.date.unwrap_or(created_at);

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (user_id, kind, amount, description, category, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, user_id, kind, amount, description, category, date, created_at",
        )?
        .query_row(
            (
                owner.as_i64(),
                builder.kind,
                builder.amount,
                builder.description,
                builder.category,
                to_storage_string(date)?,
                to_storage_string(created_at)?,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve the transaction `id` belonging to `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a transaction owned by `owner`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(
    owner: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, user_id, kind, amount, description, category, date, created_at
             FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
        )?
        .query_row(
            &[(":id", &id), (":user_id", &owner.as_i64())],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Get the number of transactions belonging to `owner`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(owner: UserID, connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = ?1",
            [owner.as_i64()],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| u64::try_from(count).unwrap_or_default())
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('INCOME', 'EXPENSE')),
                amount TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Listing pages sort on date, the dashboard on creation time.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_created_at ON \"transaction\"(user_id, created_at);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
///
/// The row must hold the columns `id, user_id, kind, amount, description,
/// category, date, created_at` in that order.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let kind = row.get(2)?;
    let amount = row.get(3)?;
    let description = row.get(4)?;
    let category = row.get(5)?;
    let date = get_date_time_column(row, 6)?;
    let created_at = get_date_time_column(row, 7)?;

    Ok(Transaction {
        id,
        user_id,
        kind,
        amount,
        description,
        category,
        date,
        created_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
