//! The endpoint for listing the logged in user's transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    pagination::{PageRequest, PaginationConfig, PaginationMeta},
    user::UserID,
};

use super::{core::TransactionKind, query::list_transactions, view::TransactionResponse};

/// The state needed for listing transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls page sizes.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ListTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The query parameters for listing transactions.
///
/// Kept as text so that malformed page numbers fall back to the defaults
/// rather than failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ListTransactionsQuery {
    fn page_request(&self, config: &PaginationConfig) -> PageRequest {
        let parse = |value: &Option<String>| value.as_deref().and_then(|v| v.trim().parse().ok());

        PageRequest::new(parse(&self.page), parse(&self.limit), config)
    }

    fn kind_filter(&self) -> Result<Option<TransactionKind>, Error> {
        match self.kind.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw_kind) => raw_kind
                .parse::<TransactionKind>()
                .map(Some)
                .map_err(|error| Error::invalid_field("type", error.to_string())),
        }
    }
}

/// The body of a transaction listing.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
    pub pagination: PaginationMeta,
}

/// A route handler for listing one page of the logged in user's transactions.
pub async fn list_transactions_endpoint(
    State(state): State<ListTransactionsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<impl IntoResponse, Error> {
    let kind = query.kind_filter()?;
    let page_request = query.page_request(&state.pagination_config);

    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let page = list_transactions(user_id, kind, page_request, &connection)?;

    Ok(Json(TransactionListResponse {
        transactions: page
            .transactions
            .into_iter()
            .map(TransactionResponse::from)
            .collect(),
        pagination: PaginationMeta::new(page_request, page.total),
    }))
}
