//! Sessions, log-in, registration and federated sign-in.

mod cookie;
mod federated;
mod identity;
mod log_in;
mod log_out;
mod middleware;
mod register;
mod token;

pub use cookie::DEFAULT_COOKIE_DURATION;
pub use federated::{federated_callback, start_federated_log_in};
pub use identity::FederationConfig;
pub use log_in::post_log_in;
pub use log_out::post_log_out;
pub use middleware::auth_guard;
pub use register::register_user;

#[cfg(test)]
pub use cookie::COOKIE_TOKEN;
