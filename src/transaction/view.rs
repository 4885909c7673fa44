//! The JSON shape of a transaction sent to clients.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{database_id::TransactionId, money::decimal_to_f64};

use super::core::{Transaction, TransactionKind};

/// A transaction as it is sent to clients.
///
/// The amount becomes a plain number and the dates RFC 3339 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: TransactionId,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    pub description: String,
    pub category: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            id: transaction.id,
            kind: transaction.kind,
            amount: decimal_to_f64(transaction.amount.as_decimal()),
            description: transaction.description,
            category: transaction.category,
            date: transaction.date,
            created_at: transaction.created_at,
        }
    }
}
