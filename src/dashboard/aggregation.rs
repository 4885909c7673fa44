//! Computes a user's totals, balance and recent activity.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use rust_decimal::Decimal;

use crate::{
    Error,
    currency::CurrencyCode,
    money::Amount,
    transaction::{Transaction, TransactionKind, map_transaction_row},
    user::UserID,
};

/// The number of transactions shown in the recent activity list.
pub const RECENT_TRANSACTION_COUNT: usize = 5;

/// The summed amounts of a user's transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    /// The sum of all income.
    pub income: Decimal,
    /// The sum of all expenses.
    pub expenses: Decimal,
}

impl Totals {
    /// Income minus expenses. Negative when more was spent than earned.
    pub fn balance(&self) -> Decimal {
        self.income - self.expenses
    }
}

/// Everything shown on a user's dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub totals: Totals,
    /// The most recently recorded transactions, newest first.
    pub recent_transactions: Vec<Transaction>,
    /// The currency of every amount in the summary.
    pub currency: CurrencyCode,
}

/// Add up `amounts` per transaction kind.
///
/// # Errors
/// Returns [Error::AmountOverflow] if a total does not fit in a [Decimal].
pub fn sum_by_kind(
    amounts: impl IntoIterator<Item = (TransactionKind, Amount)>,
) -> Result<Totals, Error> {
    amounts
        .into_iter()
        .try_fold(Totals::default(), |mut totals, (kind, amount)| {
            let total = match kind {
                TransactionKind::Income => &mut totals.income,
                TransactionKind::Expense => &mut totals.expenses,
            };
            *total = total
                .checked_add(amount.as_decimal())
                .ok_or(Error::AmountOverflow)?;

            Ok(totals)
        })
}

/// Compute the dashboard of `owner`.
///
/// The totals, the recent transactions and the currency are read in one SQL
/// transaction, so they all describe the same set of rows.
///
/// # Errors
/// Returns:
/// - [Error::AmountOverflow] if a total does not fit in a [Decimal],
/// - or [Error::SqlError] if there is an SQL error.
pub fn compute_dashboard(owner: UserID, connection: &Connection) -> Result<DashboardSummary, Error> {
    let sql_transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Deferred)?;

    let amounts = sql_transaction
        .prepare("SELECT kind, amount FROM \"transaction\" WHERE user_id = :user_id")?
        .query_map(&[(":user_id", &owner.as_i64())], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<Result<Vec<(TransactionKind, Amount)>, _>>()?;
    let totals = sum_by_kind(amounts)?;

    let recent_transactions = sql_transaction
        .prepare(
            "SELECT id, user_id, kind, amount, description, category, date, created_at
             FROM \"transaction\" WHERE user_id = :user_id
             ORDER BY created_at DESC, id DESC
             LIMIT :limit",
        )?
        .query_map(
            rusqlite::named_params! {
                ":user_id": owner.as_i64(),
                ":limit": RECENT_TRANSACTION_COUNT as i64,
            },
            map_transaction_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let currency = sql_transaction
        .query_row(
            "SELECT currency FROM user WHERE id = :id",
            &[(":id", &owner.as_i64())],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or_default();

    sql_transaction.commit()?;

    Ok(DashboardSummary {
        totals,
        recent_transactions,
        currency,
    })
}

#[cfg(test)]
mod sum_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::{Error, money::Amount, transaction::TransactionKind};

    use super::{Totals, sum_by_kind};

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn empty_is_zero() {
        let totals = sum_by_kind(Vec::<(TransactionKind, Amount)>::new()).unwrap();

        assert_eq!(totals, Totals::default());
        assert_eq!(totals.balance(), Decimal::ZERO);
    }

    #[test]
    fn sums_each_kind_separately() {
        let totals = sum_by_kind([
            (TransactionKind::Income, amount(dec!(5000))),
            (TransactionKind::Expense, amount(dec!(1200))),
            (TransactionKind::Expense, amount(dec!(300))),
        ])
        .unwrap();

        assert_eq!(totals.income, dec!(5000));
        assert_eq!(totals.expenses, dec!(1500));
        assert_eq!(totals.balance(), dec!(3500));
    }

    #[test]
    fn balance_can_be_negative() {
        let totals = sum_by_kind([
            (TransactionKind::Income, amount(dec!(10.10))),
            (TransactionKind::Expense, amount(dec!(20.20))),
        ])
        .unwrap();

        assert_eq!(totals.balance(), dec!(-10.10));
    }

    #[test]
    fn decimal_sums_are_exact() {
        let totals = sum_by_kind([
            (TransactionKind::Income, amount(dec!(0.1))),
            (TransactionKind::Income, amount(dec!(0.2))),
        ])
        .unwrap();

        assert_eq!(totals.income, dec!(0.3));
    }

    #[test]
    fn overflow_is_an_error() {
        let result = sum_by_kind([
            (TransactionKind::Income, amount(Decimal::MAX)),
            (TransactionKind::Income, amount(Decimal::MAX)),
        ]);

        assert_eq!(result, Err(Error::AmountOverflow));
    }
}
