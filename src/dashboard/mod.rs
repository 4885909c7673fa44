//! Dashboard module
//!
//! Summarises a user's ledger: income and expense totals, the balance, and the
//! most recently recorded transactions.

mod aggregation;
mod handlers;

pub use handlers::get_dashboard_endpoint;
