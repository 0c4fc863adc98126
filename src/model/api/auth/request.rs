use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::identity::{IdentityCore, NewIdentity, Role};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A request to create a constituent account. Accounts are always created
/// with the `konstituen` role; admins are provisioned out of band.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    /// Check the request and hash the password, producing an identity ready to insert.
    pub fn into_identity(self) -> Result<NewIdentity> {
        let username = self.username.trim();
        let full_name = self.full_name.trim();
        let email = self.email.trim().to_lowercase();

        if username.is_empty() || full_name.is_empty() {
            return Err(bad_request("Username and full name are required"));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(bad_request("Username must not contain whitespace"));
        }
        if !is_plausible_email(&email) {
            return Err(bad_request("Email address is not valid"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::Status(
                Status::BadRequest,
                format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
            ));
        }

        Ok(IdentityCore::new(
            username.to_string(),
            full_name.to_string(),
            email,
            IdentityCore::hash_password(&self.password)?,
            Role::Konstituen,
        ))
    }
}

/// Username/password credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

fn bad_request(message: &str) -> Error {
    Error::Status(Status::BadRequest, message.to_string())
}

/// One `@` with something on both sides, and a dot in the domain.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.contains('@') && domain.contains('.')
        }
        None => false,
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl RegisterRequest {
        pub fn example() -> Self {
            Self {
                username: "warga".to_string(),
                full_name: "Warga Kota Malang".to_string(),
                email: "warga@example.com".to_string(),
                password: "kata-sandi-warga".to_string(),
            }
        }

        pub fn example2() -> Self {
            Self {
                username: "tetangga".to_string(),
                full_name: "Tetangga Sebelah".to_string(),
                email: "tetangga@example.com".to_string(),
                password: "kata-sandi-tetangga".to_string(),
            }
        }
    }

    impl LoginRequest {
        pub fn example() -> Self {
            let registration = RegisterRequest::example();
            Self {
                username: registration.username,
                password: registration.password,
            }
        }
    }
}
