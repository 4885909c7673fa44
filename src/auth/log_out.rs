//! Log-out route handler that invalidates the session cookie.

use axum::{Json, response::IntoResponse};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};

use crate::auth::cookie::invalidate_auth_cookie;

/// The body returned after logging out.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct LogOutResponse {
    pub message: String,
}

/// Invalidate the auth cookie.
///
/// Always succeeds, even without a session.
pub async fn post_log_out(jar: PrivateCookieJar) -> impl IntoResponse {
    let jar = invalidate_auth_cookie(jar);

    (
        jar,
        Json(LogOutResponse {
            message: "Logged out".to_owned(),
        }),
    )
}
