//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}', use [format_endpoint].

#[cfg(test)]
use std::fmt::Display;

/// Where the browser is sent after a federated sign-in.
pub const DASHBOARD_VIEW: &str = "/dashboard";

/// The route for registering a new user.
pub const REGISTER_API: &str = "/api/auth/register";
/// The route for logging in with an email and password.
pub const LOG_IN_API: &str = "/api/auth/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT_API: &str = "/api/auth/log_out";
/// The route that starts a sign-in with the identity provider.
pub const FEDERATED_LOG_IN: &str = "/api/auth/federated";
/// The route the identity provider sends the browser back to.
pub const FEDERATED_CALLBACK: &str = "/api/auth/callback";

/// The route for the dashboard summary.
pub const DASHBOARD_API: &str = "/api/dashboard";
/// The route to access transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION_API: &str = "/api/transactions/{transaction_id}";
/// The route to access the logged in user.
pub const USER: &str = "/api/user";
/// The route to change the logged in user's currency.
pub const USER_CURRENCY: &str = "/api/user/currency";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
#[cfg(test)]
pub fn format_endpoint(endpoint_path: &str, id: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
