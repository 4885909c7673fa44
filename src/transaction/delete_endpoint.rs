use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, database_id::TransactionId, user::UserID};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    /// The database connection for managing transactions.
    db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The body sent after a transaction is deleted.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DeleteTransactionResponse {
    pub message: String,
}

/// A route handler for deleting one of the logged in user's transactions.
///
/// IDs that are not integers cannot refer to a transaction, so they get the
/// same not found response as IDs of other users' transactions.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(raw_transaction_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    let transaction_id: TransactionId =
        raw_transaction_id.parse().map_err(|_| Error::NotFound)?;

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    delete_transaction(user_id, transaction_id, &connection)?;

    tracing::debug!("User {user_id} deleted transaction {transaction_id}");

    Ok(Json(DeleteTransactionResponse {
        message: "Transaction deleted successfully".to_owned(),
    }))
}

type RowsAffected = usize;

/// Delete the transaction `id` if it belongs to `owner`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no transaction `id` owned by `owner`,
/// whether or not the ID belongs to someone else.
pub fn delete_transaction(
    owner: UserID,
    id: TransactionId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected: RowsAffected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
        &[(":id", &id), (":user_id", &owner.as_i64())],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        db::initialize,
        money::Amount,
        test_utils::create_test_user,
        transaction::{Transaction, TransactionKind, create_transaction, get_transaction},
    };

    use super::delete_transaction;

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn rent() -> crate::transaction::TransactionBuilder {
        Transaction::build(
            TransactionKind::Expense,
            Amount::new(dec!(1200)).unwrap(),
            "December rent",
            "Rent",
        )
    }

    #[test]
    fn deletes_transaction() {
        let connection = get_test_connection();
        let owner = create_test_user(&connection, "owner@example.com");
        let transaction = create_transaction(owner, rent(), &connection).unwrap();

        delete_transaction(owner, transaction.id, &connection).unwrap();

        assert_eq!(
            get_transaction(owner, transaction.id, &connection),
            Err(Error::NotFound)
        )
    }

    #[test]
    fn second_delete_is_not_found() {
        let connection = get_test_connection();
        let owner = create_test_user(&connection, "owner@example.com");
        let transaction = create_transaction(owner, rent(), &connection).unwrap();

        assert_eq!(delete_transaction(owner, transaction.id, &connection), Ok(()));
        assert_eq!(
            delete_transaction(owner, transaction.id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn cannot_delete_other_users_transaction() {
        let connection = get_test_connection();
        let owner = create_test_user(&connection, "owner@example.com");
        let intruder = create_test_user(&connection, "intruder@example.com");
        let transaction = create_transaction(owner, rent(), &connection).unwrap();

        assert_eq!(
            delete_transaction(intruder, transaction.id, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            get_transaction(owner, transaction.id, &connection),
            Ok(transaction)
        );
    }

    #[test]
    fn missing_transaction_is_not_found() {
        let connection = get_test_connection();
        let owner = create_test_user(&connection, "owner@example.com");

        assert_eq!(
            delete_transaction(owner, 12345, &connection),
            Err(Error::NotFound)
        );
    }
}
