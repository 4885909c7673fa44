#![allow(missing_docs)]

use axum_extra::extract::cookie::Cookie;
use axum_test::TestServer;
use email_address::EmailAddress;
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState,
    auth::{COOKIE_TOKEN, FederationConfig},
    build_router, endpoints,
    pagination::PaginationConfig,
    user::{NewUser, UserID, create_user},
};

/// A password that zxcvbn rates as strong.
pub(crate) const TEST_PASSWORD: &str = "averystrongpassword123!";

fn get_test_state(federation: Option<FederationConfig>) -> AppState {
    AppState::new(
        Connection::open_in_memory().expect("Could not open database in memory."),
        "42",
        PaginationConfig::default(),
        federation,
    )
    .expect("Could not create app state.")
}

/// A server over the full router backed by an empty in-memory database.
pub(crate) fn get_test_server() -> TestServer {
    TestServer::new(build_router(get_test_state(None)))
}

/// Like [get_test_server], with federated sign-in enabled.
pub(crate) fn get_test_server_with_federation(federation: FederationConfig) -> TestServer {
    TestServer::new(build_router(get_test_state(Some(federation))))
}

/// Register a user with `email` and return their session cookie.
pub(crate) async fn register_and_log_in(server: &TestServer, email: &str) -> Cookie<'static> {
    let response = server
        .post(endpoints::REGISTER_API)
        .json(&json!({"name": "Test User", "email": email, "password": TEST_PASSWORD}))
        .await;

    response.assert_status(axum::http::StatusCode::CREATED);

    response.cookie(COOKIE_TOKEN)
}

/// Insert a user without a password straight into the database.
pub(crate) fn create_test_user(connection: &Connection, email: &str) -> UserID {
    create_user(
        NewUser {
            name: None,
            email: EmailAddress::new_unchecked(email),
            password_hash: None,
        },
        connection,
    )
    .expect("Could not create test user.")
    .id
}
