//! This file defines the route for logging in with an email and password.
//! The cookie module handles the lower level session cookie logic.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::IntoResponse,
};
use axum_extra::extract::{PrivateCookieJar, WithRejection, cookie::Key};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        cookie::{REMEMBER_ME_COOKIE_DURATION, set_auth_cookie},
        identity::{Credentials, verify},
    },
    user::UserProfile,
};

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The data for a log-in request.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInData {
    pub email: String,
    pub password: String,
    /// Keep the user logged in for a week instead of the default session duration.
    #[serde(default)]
    pub remember_me: bool,
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie is set and the user's
/// profile is returned.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The email or password is not correct ([Error::InvalidCredentials]).
/// - The body is not valid JSON ([Error::InvalidInput]).
/// - An internal error occurred when verifying the password.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    WithRejection(Json(user_data), _): WithRejection<Json<LogInData>, Error>,
) -> Result<impl IntoResponse, Error> {
    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        verify(
            Credentials::Password {
                email: user_data.email.trim().to_owned(),
                password: user_data.password,
            },
            None,
            &connection,
        )?
    };

    let cookie_duration = if user_data.remember_me {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };
    let jar = set_auth_cookie(jar, user.id, cookie_duration)?;
    tracing::info!("User {} logged in", user.id);

    Ok((jar, Json(UserProfile::from(&user))))
}
