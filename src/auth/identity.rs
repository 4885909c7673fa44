//! Verifies who a user is, either from an email and password or from an
//! identity assertion issued by an external identity provider.

use std::str::FromStr;

use email_address::EmailAddress;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    password::PasswordHash,
    user::{NewUser, User, create_user, get_user_by_email},
};

/// A bcrypt hash of a random password, checked when the email is unknown so
/// that unknown emails take as long to reject as wrong passwords.
const DUMMY_PASSWORD_HASH: &str = "$2b$12$Gwf0uvxH3L7JLfo0CC/NCOoijK2vQ/wbgP.LeNup8vj6gg31IiFkm";

/// The names of the environment variables that configure federated sign-in.
pub const FEDERATION_ENV_VARS: [&str; 5] = [
    "FEDERATION_ISSUER",
    "FEDERATION_CLIENT_ID",
    "FEDERATION_CLIENT_SECRET",
    "FEDERATION_AUTHORIZE_URL",
    "FEDERATION_REDIRECT_URL",
];

/// How to reach and trust the external identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct FederationConfig {
    /// The expected `iss` claim of identity assertions.
    pub issuer: String,
    /// This application's client ID at the provider, the expected `aud` claim.
    pub client_id: String,
    /// The secret shared with the provider that assertions are signed with.
    pub client_secret: String,
    /// Where the browser is sent to sign in at the provider.
    pub authorize_url: String,
    /// Where the provider sends the browser back to, i.e. the callback endpoint.
    pub redirect_url: String,
}

impl FederationConfig {
    /// Build the config from variables looked up with `lookup`, see [FEDERATION_ENV_VARS].
    ///
    /// Returns `None` unless every variable is set and non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let [issuer, client_id, client_secret, authorize_url, redirect_url] =
            FEDERATION_ENV_VARS.map(|name| lookup(name).filter(|value| !value.is_empty()));

        Some(Self {
            issuer: issuer?,
            client_id: client_id?,
            client_secret: client_secret?,
            authorize_url: authorize_url?,
            redirect_url: redirect_url?,
        })
    }

    /// Build the config from the process environment.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

// Never print the client secret.
impl std::fmt::Debug for FederationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederationConfig")
            .field("issuer", &self.issuer)
            .field("client_id", &self.client_id)
            .field("client_secret", &"********")
            .field("authorize_url", &self.authorize_url)
            .field("redirect_url", &self.redirect_url)
            .finish()
    }
}

/// The claims read from an identity assertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedClaims {
    pub iss: String,
    pub aud: String,
    pub exp: u64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
}

/// The ways a user can prove who they are.
#[derive(Clone)]
pub enum Credentials {
    /// An email and password checked against the stored password hash.
    Password { email: String, password: String },
    /// A signed identity assertion from the identity provider.
    Federated {
        /// The signed assertion (a JWT).
        assertion: String,
        /// The state stored in the browser when the sign-in started.
        expected_state: Option<String>,
        /// The state the identity provider sent back.
        received_state: String,
    },
}

// Never print passwords or assertions.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .finish_non_exhaustive(),
            Credentials::Federated { .. } => f.debug_struct("Federated").finish_non_exhaustive(),
        }
    }
}

/// Find the user that `credentials` belong to.
///
/// Users signing in with the identity provider for the first time are created,
/// without a password and with the default currency.
///
/// # Errors
///
/// Returns:
/// - [Error::InvalidCredentials] if the credentials do not prove who the user
///   is. Unknown emails, accounts without a password and wrong passwords are
///   not told apart.
/// - [Error::NotFound] if federated credentials are given but `federation` is `None`.
/// - [Error::HashingError] if a stored password hash cannot be checked.
/// - [Error::SqlError] if there is an SQL error.
pub fn verify(
    credentials: Credentials,
    federation: Option<&FederationConfig>,
    connection: &Connection,
) -> Result<User, Error> {
    match credentials {
        Credentials::Password { email, password } => verify_password(&email, &password, connection),
        Credentials::Federated {
            assertion,
            expected_state,
            received_state,
        } => {
            let federation = federation.ok_or(Error::NotFound)?;

            if expected_state.as_deref() != Some(received_state.as_str()) {
                tracing::warn!("Federated sign-in rejected: state mismatch");
                return Err(Error::InvalidCredentials);
            }

            verify_assertion(&assertion, federation, connection)
        }
    }
}

fn verify_password(email: &str, password: &str, connection: &Connection) -> Result<User, Error> {
    let Some(user) = get_user_by_email(email, connection)? else {
        reject_without_hash(password);
        return Err(Error::InvalidCredentials);
    };
    let Some(password_hash) = user.password_hash.as_ref() else {
        reject_without_hash(password);
        return Err(Error::InvalidCredentials);
    };

    match password_hash.verify(password) {
        Ok(true) => Ok(user),
        Ok(false) => Err(Error::InvalidCredentials),
        Err(error) => {
            tracing::error!("Could not verify password hash: {error}");
            Err(Error::HashingError(error.to_string()))
        }
    }
}

fn reject_without_hash(password: &str) {
    let _ = PasswordHash::new_unchecked(DUMMY_PASSWORD_HASH).verify(password);
}

/// Check an identity assertion and find or create the user it names.
fn verify_assertion(
    assertion: &str,
    federation: &FederationConfig,
    connection: &Connection,
) -> Result<User, Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&federation.issuer]);
    validation.set_audience(&[&federation.client_id]);
    validation.set_required_spec_claims(&["exp", "iss", "aud"]);

    let claims = decode::<FederatedClaims>(
        assertion,
        &DecodingKey::from_secret(federation.client_secret.as_bytes()),
        &validation,
    )
    .map_err(|error| {
        tracing::warn!("Federated sign-in rejected: {error}");
        Error::InvalidCredentials
    })?
    .claims;

    if claims.email_verified == Some(false) {
        tracing::warn!("Federated sign-in rejected: email not verified");
        return Err(Error::InvalidCredentials);
    }

    let email = claims
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .and_then(|email| EmailAddress::from_str(email).ok())
        .ok_or_else(|| {
            tracing::warn!("Federated sign-in rejected: missing or invalid email");
            Error::InvalidCredentials
        })?;

    if let Some(user) = get_user_by_email(email.as_str(), connection)? {
        return Ok(user);
    }

    let user = create_user(
        NewUser {
            name: claims.name,
            email,
            password_hash: None,
        },
        connection,
    )?;
    tracing::info!("Created user {} on first federated sign-in", user.id);

    Ok(user)
}
