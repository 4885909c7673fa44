//! Dashboard HTTP handlers.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, money::decimal_to_f64, transaction::TransactionResponse, user::UserID,
};

use super::aggregation::{DashboardSummary, compute_dashboard};

/// The state needed for the dashboard.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The dashboard as it is sent to clients.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
    pub recent_transactions: Vec<TransactionResponse>,
    pub currency: String,
}

impl From<DashboardSummary> for DashboardResponse {
    fn from(summary: DashboardSummary) -> Self {
        Self {
            total_income: decimal_to_f64(summary.totals.income),
            total_expenses: decimal_to_f64(summary.totals.expenses),
            balance: decimal_to_f64(summary.totals.balance()),
            recent_transactions: summary
                .recent_transactions
                .into_iter()
                .map(TransactionResponse::from)
                .collect(),
            currency: summary.currency.to_string(),
        }
    }
}

/// A route handler for the logged in user's dashboard summary.
pub async fn get_dashboard_endpoint(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Result<impl IntoResponse, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;
    let summary = compute_dashboard(user_id, &connection)?;

    Ok(Json(DashboardResponse::from(summary)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        endpoints,
        test_utils::{get_test_server, register_and_log_in},
    };

    use super::DashboardResponse;

    #[tokio::test]
    async fn dashboard_sums_transactions() {
        let server = get_test_server();
        let cookie = register_and_log_in(&server, "dashboard@example.com").await;
        for (kind, amount, category, date) in [
            ("INCOME", 5000, "Salary", "2024-12-01"),
            ("EXPENSE", 1200, "Rent", "2024-12-01"),
            ("EXPENSE", 300, "Groceries", "2024-12-02"),
        ] {
            server
                .post(endpoints::TRANSACTIONS_API)
                .add_cookie(cookie.clone())
                .json(&json!({
                    "type": kind,
                    "amount": amount,
                    "description": category,
                    "category": category,
                    "date": date,
                }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = server.get(endpoints::DASHBOARD_API).add_cookie(cookie).await;

        response.assert_status_ok();
        let dashboard = response.json::<DashboardResponse>();
        assert_eq!(dashboard.total_income, 5000.0);
        assert_eq!(dashboard.total_expenses, 1500.0);
        assert_eq!(dashboard.balance, 3500.0);
        assert_eq!(dashboard.currency, "USD");
        assert_eq!(dashboard.recent_transactions.len(), 3);
        assert_eq!(dashboard.recent_transactions[0].category, "Groceries");
    }

    #[tokio::test]
    async fn dashboard_uses_camel_case_fields() {
        let server = get_test_server();
        let cookie = register_and_log_in(&server, "camel@example.com").await;

        let body = server
            .get(endpoints::DASHBOARD_API)
            .add_cookie(cookie)
            .await
            .json::<serde_json::Value>();

        assert_eq!(
            body,
            json!({
                "totalIncome": 0.0,
                "totalExpenses": 0.0,
                "balance": 0.0,
                "recentTransactions": [],
                "currency": "USD",
            })
        );
    }

    #[tokio::test]
    async fn dashboard_requires_session() {
        let server = get_test_server();

        let response = server.get(endpoints::DASHBOARD_API).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<serde_json::Value>(),
            json!({"error": "Unauthorized", "message": "Unauthorized"})
        );
    }
}
