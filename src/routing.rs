//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::{
    AppState, Error,
    auth::{
        auth_guard, federated_callback, post_log_in, post_log_out, register_user,
        start_federated_log_in,
    },
    currency::update_currency_endpoint,
    dashboard::get_dashboard_endpoint,
    endpoints,
    logging::logging_middleware,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, list_transactions_endpoint,
    },
    user::get_user_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::REGISTER_API, post(register_user))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT_API, post(post_log_out))
        .route(endpoints::FEDERATED_LOG_IN, get(start_federated_log_in))
        .route(endpoints::FEDERATED_CALLBACK, get(federated_callback));

    let protected_routes = Router::new()
        .route(endpoints::DASHBOARD_API, get(get_dashboard_endpoint))
        .route(
            endpoints::TRANSACTIONS_API,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION_API,
            delete(delete_transaction_endpoint),
        )
        .route(endpoints::USER, get(get_user_endpoint))
        .route(endpoints::USER_CURRENCY, put(update_currency_endpoint))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}
