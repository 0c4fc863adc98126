use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use argon2::Config;
use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::model::{district::Nik, mongodb::Id};

mod admin;
pub use admin::{ensure_admin_exists, AdminCredentials};

mod context;
pub use context::AuthenticatedIdentity;

mod verify;
pub use verify::{verify_identity, VerifyError};

/// Privilege levels.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Role {
    /// An ordinary constituent.
    Konstituen = 0,
    Admin = 1,
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Konstituen => "konstituen",
                Self::Admin => "admin",
            }
        )
    }
}

/// The district placement established by a successful NIK verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub nik: Nik,
    pub locality: String,
    pub district: String,
}

/// Core user data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityCore {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub nik: Option<Nik>,
    pub nik_verified: bool,
    pub locality: Option<String>,
    pub district: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl IdentityCore {
    /// A fresh, unverified identity.
    pub fn new(
        username: String,
        full_name: String,
        email: String,
        password_hash: String,
        role: Role,
    ) -> Self {
        Self {
            username,
            full_name,
            email,
            password_hash,
            role,
            nik: None,
            nik_verified: false,
            locality: None,
            district: None,
            created_at: Utc::now(),
            is_active: true,
        }
    }

    /// Hash a plaintext password for storage.
    pub fn hash_password<T: AsRef<[u8]>>(password: T) -> Result<String, argon2::Error> {
        // 16 bytes is the recommended salt length for Argon2.
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        argon2::hash_encoded(password.as_ref(), &salt, &Config::default())
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }

    /// The verified district placement, if there is one.
    pub fn verification(&self) -> Option<Verification> {
        if !self.nik_verified {
            return None;
        }
        Some(Verification {
            nik: self.nik.clone()?,
            locality: self.locality.clone()?,
            district: self.district.clone()?,
        })
    }

    pub fn is_verified(&self) -> bool {
        self.verification().is_some()
    }

    /// Overwrite the placement with a new verification.
    pub fn apply_verification(&mut self, verification: Verification) {
        self.nik = Some(verification.nik);
        self.locality = Some(verification.locality);
        self.district = Some(verification.district);
        self.nik_verified = true;
    }
}

/// An identity without an ID.
pub type NewIdentity = IdentityCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub identity: IdentityCore,
}

impl Deref for Identity {
    type Target = IdentityCore;

    fn deref(&self) -> &Self::Target {
        &self.identity
    }
}

impl DerefMut for Identity {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.identity
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    /// Placeholder hash; tests that log in register through the API instead.
    pub const EXAMPLE_PASSWORD_HASH: &str = "$argon2i$v=19$m=4096,t=3,p=1$c29tZXNhbHRzb21lc2FsdA$Jx6QmCqTbVwYMRkVwIH3M2D9ko+uH5nfYXVfj/8Yi0M";

    impl IdentityCore {
        pub fn example() -> Self {
            Self::new(
                "warga".to_string(),
                "Warga Kota Malang".to_string(),
                "warga@example.com".to_string(),
                EXAMPLE_PASSWORD_HASH.to_string(),
                Role::Konstituen,
            )
        }

        pub fn example_verified() -> Self {
            let mut identity = Self::example();
            identity.apply_verification(Verification::example());
            identity
        }
    }

    impl Verification {
        pub fn example() -> Self {
            Self {
                nik: Nik::parse("3573010101900001").unwrap(),
                locality: "Klojen".to_string(),
                district: "JAWA TIMUR VI".to_string(),
            }
        }
    }
}
