mod auth;
mod error_handler;
mod rate_limit;

pub use auth::{AuthUser, identify};
pub use error_handler::log_errors;
pub use rate_limit::{client_identity, rate_limit};
