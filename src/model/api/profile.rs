use chrono::{serde::ts_seconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::identity::Identity;

/// An identity as shown to its owner. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub nik: Option<String>,
    pub nik_verified: bool,
    pub locality: Option<String>,
    pub district: Option<String>,
    #[serde(with = "ts_seconds")]
    pub created_at: DateTime<Utc>,
}

impl From<Identity> for ProfileView {
    fn from(identity: Identity) -> Self {
        let id = identity.id.to_string();
        let identity = identity.identity;
        Self {
            id,
            role: identity.role.to_string(),
            nik: identity.nik.map(|nik| nik.as_str().to_string()),
            username: identity.username,
            full_name: identity.full_name,
            email: identity.email,
            nik_verified: identity.nik_verified,
            locality: identity.locality,
            district: identity.district,
            created_at: identity.created_at,
        }
    }
}

/// A request to place the caller in a district by their NIK, optionally
/// naming the district they expect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyNikRequest {
    pub nik: String,
    #[serde(default)]
    pub district: Option<String>,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VerifyNikRequest {
        pub fn example() -> Self {
            Self {
                nik: "3573050101900001".to_string(),
                district: None,
            }
        }
    }
}
