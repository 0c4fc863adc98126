mod guard;
mod request;
mod token;

pub use guard::Admin;
pub use request::{LoginRequest, RegisterRequest, MIN_PASSWORD_LENGTH};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};
