//! Policy documents published for constituents to read.

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson};
use rocket::FromFormField;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Where a policy stands in its drafting process.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, FromFormField)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    #[field(value = "draft")]
    Draft,
    #[field(value = "submitted")]
    Submitted,
    #[field(value = "approved")]
    Approved,
    #[field(value = "rejected")]
    Rejected,
}

impl Default for PolicyStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl From<PolicyStatus> for Bson {
    fn from(status: PolicyStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// The legal instrument a policy takes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    /// Regional regulation (peraturan daerah).
    Perda,
    Kebijakan,
    Regulasi,
}

/// Core policy data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCore {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub policy_type: PolicyType,
    pub status: PolicyStatus,
    pub effective_date: Option<NaiveDate>,
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// A policy without an ID.
pub type NewPolicy = PolicyCore;

/// A policy from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub policy: PolicyCore,
}

impl Deref for Policy {
    type Target = PolicyCore;

    fn deref(&self) -> &Self::Target {
        &self.policy
    }
}

impl DerefMut for Policy {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.policy
    }
}

/// Restricts a policy listing. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyFilter {
    pub status: Option<PolicyStatus>,
    pub category: Option<String>,
}

impl PolicyFilter {
    pub fn matches(&self, policy: &PolicyCore) -> bool {
        self.status.map_or(true, |status| policy.status == status)
            && self
                .category
                .as_ref()
                .map_or(true, |category| &policy.category == category)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl PolicyCore {
        pub fn example(created_by: Id) -> Self {
            let now = Utc::now();
            Self {
                title: "Perda Pengelolaan Sampah".to_string(),
                description: "Pengurangan dan penanganan sampah rumah tangga".to_string(),
                content: "Pasal 1. Setiap rumah tangga wajib memilah sampah.".to_string(),
                category: "lingkungan".to_string(),
                policy_type: PolicyType::Perda,
                status: PolicyStatus::Draft,
                effective_date: None,
                created_by,
                created_at: now,
                updated_at: now,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_by_status_and_category() {
        let mut policy = PolicyCore::example(Id::new());
        policy.status = PolicyStatus::Approved;

        assert!(PolicyFilter::default().matches(&policy));
        let approved = PolicyFilter {
            status: Some(PolicyStatus::Approved),
            category: None,
        };
        assert!(approved.matches(&policy));
        let drafts = PolicyFilter {
            status: Some(PolicyStatus::Draft),
            category: None,
        };
        assert!(!drafts.matches(&policy));
        let other_category = PolicyFilter {
            status: Some(PolicyStatus::Approved),
            category: Some("kesehatan".to_string()),
        };
        assert!(!other_category.matches(&policy));
    }
}
