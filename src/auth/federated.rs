//! Sign-in through an external identity provider.
//!
//! The browser is sent to the provider with a random `state`, which is also
//! kept in a short-lived private cookie. The provider sends the browser back
//! to the callback with a signed identity assertion and the same `state`.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        cookie::set_auth_cookie,
        identity::{Credentials, FederationConfig, verify},
    },
    endpoints,
};

/// The name of the cookie that holds the `state` of a sign-in in progress.
pub const COOKIE_FEDERATION_STATE: &str = "federation_state";
/// How long the user has to finish signing in at the identity provider.
const FEDERATION_STATE_DURATION: Duration = Duration::minutes(10);

/// The state needed for federated sign-in.
#[derive(Debug, Clone)]
pub struct FederatedState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The identity provider, `None` if federated sign-in is disabled.
    pub federation: Option<FederationConfig>,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for FederatedState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            federation: state.federation.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<FederatedState> for Key {
    fn from_ref(state: &FederatedState) -> Self {
        state.cookie_key.clone()
    }
}

/// Build the URL of the identity provider's sign-in page.
fn authorize_url(federation: &FederationConfig, state: &str) -> Result<String, Error> {
    let query = serde_urlencoded::to_string([
        ("client_id", federation.client_id.as_str()),
        ("redirect_uri", federation.redirect_url.as_str()),
        ("response_type", "id_token"),
        ("scope", "openid profile email"),
        ("state", state),
    ])
    .map_err(|error| Error::FederationUnavailable(error.to_string()))?;

    let separator = if federation.authorize_url.contains('?') {
        '&'
    } else {
        '?'
    };

    Ok(format!("{}{separator}{query}", federation.authorize_url))
}

/// Start a federated sign-in by redirecting to the identity provider.
///
/// # Errors
///
/// Returns [Error::NotFound] if federated sign-in is not configured.
pub async fn start_federated_log_in(
    State(state): State<FederatedState>,
    jar: PrivateCookieJar,
) -> Result<impl IntoResponse, Error> {
    let federation = state.federation.as_ref().ok_or(Error::NotFound)?;

    let nonce = format!("{:032x}", rand::random::<u128>());
    let url = authorize_url(federation, &nonce)?;
    let jar = jar.add(
        Cookie::build((COOKIE_FEDERATION_STATE, nonce))
            .max_age(FEDERATION_STATE_DURATION)
            .http_only(true)
            // Lax so that the cookie is sent on the provider's redirect back.
            .same_site(SameSite::Lax)
            .secure(true)
            .path("/"),
    );

    Ok((jar, Redirect::to(&url)))
}

/// The query parameters the identity provider calls back with.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub id_token: Option<String>,
    pub state: Option<String>,
}

/// Finish a federated sign-in: check the assertion, log the user in and
/// redirect to the dashboard.
///
/// # Errors
///
/// Returns:
/// - [Error::NotFound] if federated sign-in is not configured.
/// - [Error::InvalidCredentials] if the assertion or state is missing or invalid.
pub async fn federated_callback(
    State(state): State<FederatedState>,
    jar: PrivateCookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, Error> {
    let federation = state.federation.as_ref().ok_or(Error::NotFound)?;
    let (Some(assertion), Some(received_state)) = (query.id_token, query.state) else {
        tracing::warn!("Federated sign-in rejected: callback missing id_token or state");
        return Err(Error::InvalidCredentials);
    };
    let expected_state = jar
        .get(COOKIE_FEDERATION_STATE)
        .map(|cookie| cookie.value().to_owned());

    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        verify(
            Credentials::Federated {
                assertion,
                expected_state,
                received_state,
            },
            Some(federation),
            &connection,
        )?
    };

    let jar = jar.remove(Cookie::build(COOKIE_FEDERATION_STATE).path("/"));
    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;
    tracing::info!("User {} logged in with the identity provider", user.id);

    Ok((jar, Redirect::to(endpoints::DASHBOARD_VIEW)))
}
