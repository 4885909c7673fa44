//! Database queries for listing a user's transactions a page at a time.

use rusqlite::{Connection, TransactionBehavior};

use crate::{Error, pagination::PageRequest, user::UserID};

use super::core::{Transaction, TransactionKind, map_transaction_row};

/// One page of a user's transactions.
#[derive(Debug, PartialEq)]
pub struct TransactionPage {
    /// The transactions on the requested page, newest date first.
    pub transactions: Vec<Transaction>,
    /// The number of transactions matching the filter across all pages.
    pub total: u64,
}

/// Get one page of the transactions belonging to `owner`.
///
/// Transactions are sorted by date, most recent first. Transactions on the same
/// date are sorted by when they were recorded, most recent first, so the order
/// is stable between pages.
///
/// If `kind` is given, only transactions of that kind are counted and returned.
/// A page past the last page is empty, with `total` still set.
///
/// The count and the page are read in one SQL transaction so they agree.
///
/// # Errors
/// Returns [Error::SqlError] if:
/// - SQL query preparation or execution fails
/// - Transaction row mapping fails
pub fn list_transactions(
    owner: UserID,
    kind: Option<TransactionKind>,
    page: PageRequest,
    connection: &Connection,
) -> Result<TransactionPage, Error> {
    let sql_transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Deferred)?;

    let total: i64 = sql_transaction.query_row(
        "SELECT COUNT(id) FROM \"transaction\"
         WHERE user_id = :user_id AND (:kind IS NULL OR kind = :kind)",
        rusqlite::named_params! {":user_id": owner.as_i64(), ":kind": kind},
        |row| row.get(0),
    )?;

    let transactions = sql_transaction
        .prepare(
            "SELECT id, user_id, kind, amount, description, category, date, created_at
             FROM \"transaction\"
             WHERE user_id = :user_id AND (:kind IS NULL OR kind = :kind)
             ORDER BY date DESC, created_at DESC, id DESC
             LIMIT :limit OFFSET :offset",
        )?
        .query_map(
            rusqlite::named_params! {
                ":user_id": owner.as_i64(),
                ":kind": kind,
                ":limit": i64::try_from(page.limit()).unwrap_or(i64::MAX),
                ":offset": page.offset(),
            },
            map_transaction_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    sql_transaction.commit()?;

    Ok(TransactionPage {
        transactions,
        total: u64::try_from(total).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use time::{Duration, macros::datetime};

    use crate::{
        db::initialize,
        money::Amount,
        pagination::{PageRequest, PaginationConfig},
        test_utils::create_test_user,
        transaction::{Transaction, TransactionKind, create_transaction},
        user::UserID,
    };

    use super::list_transactions;

    fn get_test_connection() -> (Connection, UserID) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user_id = create_test_user(&conn, "owner@example.com");

        (conn, user_id)
    }

    fn page(page: u64, limit: u64) -> PageRequest {
        PageRequest::new(Some(page), Some(limit), &PaginationConfig::default())
    }

    fn create(conn: &Connection, owner: UserID, kind: TransactionKind, days_ago: i64) -> i64 {
        let date = datetime!(2024-12-31 00:00 UTC) - Duration::days(days_ago);
        let amount = Amount::new(Decimal::from(days_ago + 1)).unwrap();

        create_transaction(
            owner,
            Transaction::build(kind, amount, "test", "misc").date(Some(date)),
            conn,
        )
        .unwrap()
        .id
    }

    #[test]
    fn orders_by_date_descending() {
        let (conn, owner) = get_test_connection();
        for days_ago in [3, 0, 5, 1] {
            create(&conn, owner, TransactionKind::Expense, days_ago);
        }

        let got = list_transactions(owner, None, page(1, 10), &conn).unwrap();

        let dates: Vec<_> = got.transactions.iter().map(|t| t.date).collect();
        let mut want = dates.clone();
        want.sort_by(|a, b| b.cmp(a));
        assert_eq!(dates, want);
        assert_eq!(got.total, 4);
    }

    #[test]
    fn equal_dates_are_ordered_by_creation_descending() {
        let (conn, owner) = get_test_connection();
        let first = create(&conn, owner, TransactionKind::Expense, 0);
        let second = create(&conn, owner, TransactionKind::Expense, 0);
        let third = create(&conn, owner, TransactionKind::Expense, 0);

        let got = list_transactions(owner, None, page(1, 10), &conn).unwrap();

        let ids: Vec<_> = got.transactions.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![third, second, first]);
    }

    #[test]
    fn pages_cover_every_transaction_once() {
        let (conn, owner) = get_test_connection();
        let mut want = HashSet::new();
        for days_ago in 0..23 {
            want.insert(create(&conn, owner, TransactionKind::Income, days_ago % 7));
        }

        let mut seen = Vec::new();
        let mut last_date = None;
        for page_number in 1..=5 {
            let got = list_transactions(owner, None, page(page_number, 5), &conn).unwrap();
            assert_eq!(got.total, 23);

            for transaction in got.transactions {
                if let Some(last_date) = last_date {
                    assert!(transaction.date <= last_date, "dates out of order");
                }
                last_date = Some(transaction.date);
                seen.push(transaction.id);
            }
        }

        assert_eq!(seen.len(), want.len());
        assert_eq!(seen.into_iter().collect::<HashSet<_>>(), want);
    }

    #[test]
    fn page_past_end_is_empty_with_total() {
        let (conn, owner) = get_test_connection();
        create(&conn, owner, TransactionKind::Income, 0);
        create(&conn, owner, TransactionKind::Income, 1);

        let got = list_transactions(owner, None, page(3, 10), &conn).unwrap();

        assert!(got.transactions.is_empty());
        assert_eq!(got.total, 2);
    }

    #[test]
    fn huge_page_is_empty_with_total() {
        let (conn, owner) = get_test_connection();
        create(&conn, owner, TransactionKind::Income, 0);

        let got = list_transactions(owner, None, page(u64::MAX, 100), &conn).unwrap();

        assert!(got.transactions.is_empty());
        assert_eq!(got.total, 1);
    }

    #[test]
    fn filters_by_kind() {
        let (conn, owner) = get_test_connection();
        create(&conn, owner, TransactionKind::Income, 0);
        create(&conn, owner, TransactionKind::Expense, 1);
        create(&conn, owner, TransactionKind::Expense, 2);

        let got =
            list_transactions(owner, Some(TransactionKind::Expense), page(1, 10), &conn).unwrap();

        assert_eq!(got.total, 2);
        assert!(
            got.transactions
                .iter()
                .all(|t| t.kind == TransactionKind::Expense)
        );
    }

    #[test]
    fn only_lists_own_transactions() {
        let (conn, owner) = get_test_connection();
        let other = create_test_user(&conn, "other@example.com");
        create(&conn, owner, TransactionKind::Income, 0);
        create(&conn, other, TransactionKind::Income, 0);

        let got = list_transactions(owner, None, page(1, 10), &conn).unwrap();

        assert_eq!(got.total, 1);
        assert!(got.transactions.iter().all(|t| t.user_id == owner));
    }
}
