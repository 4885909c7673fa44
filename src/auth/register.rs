//! Registration of new users with an email and password.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::{PrivateCookieJar, WithRejection, cookie::Key};
use email_address::EmailAddress;
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    auth::cookie::set_auth_cookie,
    error::FieldError,
    password::{PasswordHash, ValidatedPassword},
    user::{NewUser, UserProfile, create_user},
};

#[cfg(not(test))]
const PASSWORD_HASH_COST: u32 = PasswordHash::DEFAULT_COST;
// The lowest cost bcrypt allows, keeps the endpoint tests fast.
#[cfg(test)]
const PASSWORD_HASH_COST: u32 = 4;

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The body of a registration request.
#[derive(Default, Deserialize)]
pub struct RegisterForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// A registration request that passed validation.
#[derive(Debug)]
pub struct ValidatedRegistration {
    pub name: Option<String>,
    pub email: EmailAddress,
    pub password: ValidatedPassword,
}

impl RegisterForm {
    /// Check the email and password, reporting every problem at once.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidInput] listing each invalid field.
    pub fn validate(self) -> Result<ValidatedRegistration, Error> {
        let mut errors = Vec::new();

        let name = self
            .name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty());

        let raw_email = self.email.unwrap_or_default();
        let raw_email = raw_email.trim();
        let email = match EmailAddress::from_str(raw_email) {
            Ok(email) => Some(email),
            Err(error) => {
                errors.push(FieldError::new("email", error.to_string()));
                None
            }
        };

        let raw_password = self.password.unwrap_or_default();
        let mut user_inputs = vec![raw_email];
        if let Some(name) = name.as_deref() {
            user_inputs.push(name);
        }
        let password = match ValidatedPassword::new(&raw_password, &user_inputs) {
            Ok(password) => Some(password),
            Err(Error::InvalidInput(field_errors)) => {
                errors.extend(field_errors);
                None
            }
            Err(error) => return Err(error),
        };

        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => Ok(ValidatedRegistration {
                name,
                email,
                password,
            }),
            _ => Err(Error::InvalidInput(errors)),
        }
    }
}

/// A route handler for creating a new user.
///
/// On success the user is logged in and their profile is returned with the
/// status 201 Created.
///
/// # Errors
///
/// Returns:
/// - [Error::InvalidInput] if the email is malformed or the password too weak.
/// - [Error::DuplicateEmail] if the email is already registered.
/// - [Error::HashingError] if the password could not be hashed.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    WithRejection(Json(form), _): WithRejection<Json<RegisterForm>, Error>,
) -> Result<impl IntoResponse, Error> {
    let registration = form.validate()?;
    let password_hash = PasswordHash::new(registration.password, PASSWORD_HASH_COST)?;

    let user = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        create_user(
            NewUser {
                name: registration.name,
                email: registration.email,
                password_hash: Some(password_hash),
            },
            &connection,
        )?
    };
    tracing::info!("Registered user {}", user.id);

    let jar = set_auth_cookie(jar, user.id, state.cookie_duration)?;

    Ok((StatusCode::CREATED, jar, Json(UserProfile::from(&user))))
}


#[cfg(test)]
mod register_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        auth::cookie::COOKIE_TOKEN, endpoints, test_utils::get_test_server, user::UserProfile,
    };

    #[tokio::test]
    async fn register_creates_user_and_session() {
        let server = get_test_server();

        let response = server
            .post(endpoints::REGISTER_API)
            .json(&json!({
                "name": "Jane",
                "email": "jane@example.com",
                "password": "averystrongpassword123!"
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let profile = response.json::<UserProfile>();
        assert_eq!(profile.name.as_deref(), Some("Jane"));
        assert_eq!(profile.email, "jane@example.com");
        assert_eq!(profile.currency, "USD");

        let me = server
            .get(endpoints::USER)
            .add_cookie(response.cookie(COOKIE_TOKEN))
            .await;
        me.assert_status_ok();
        assert_eq!(me.json::<UserProfile>(), profile);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let server = get_test_server();
        let body = json!({"email": "jane@example.com", "password": "averystrongpassword123!"});
        server
            .post(endpoints::REGISTER_API)
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.post(endpoints::REGISTER_API).json(&body).await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(response.json::<serde_json::Value>()["error"], "Conflict");
        assert!(response.maybe_cookie(COOKIE_TOKEN).is_none());
    }

    #[tokio::test]
    async fn weak_password_is_rejected() {
        let server = get_test_server();

        let response = server
            .post(endpoints::REGISTER_API)
            .json(&json!({"email": "jane@example.com", "password": "password"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<serde_json::Value>();
        assert_eq!(body["error"], "InvalidInput");
        assert_eq!(body["fields"][0]["field"], "password");
    }
}
