use chrono::{serde::ts_seconds, DateTime, NaiveDate, Utc};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    mongodb::Id,
    policy::{NewPolicy, Policy, PolicyCore, PolicyStatus, PolicyType},
};

/// An API-friendly policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub policy_type: PolicyType,
    pub status: PolicyStatus,
    pub effective_date: Option<NaiveDate>,
    pub created_by: String,
    #[serde(with = "ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

impl From<Policy> for PolicyView {
    fn from(policy: Policy) -> Self {
        let Policy { id, policy } = policy;
        Self {
            id: id.to_string(),
            title: policy.title,
            description: policy.description,
            content: policy.content,
            category: policy.category,
            policy_type: policy.policy_type,
            status: policy.status,
            effective_date: policy.effective_date,
            created_by: policy.created_by.to_string(),
            created_at: policy.created_at,
            updated_at: policy.updated_at,
        }
    }
}

/// Trim a required text field, refusing it if nothing is left.
fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::Status(
            Status::BadRequest,
            format!("{field} is required"),
        ));
    }
    Ok(value.to_string())
}

/// A request to publish a new policy. Policies start as drafts unless
/// another status is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePolicyRequest {
    pub title: String,
    pub description: String,
    pub content: String,
    pub category: String,
    pub policy_type: PolicyType,
    #[serde(default)]
    pub status: Option<PolicyStatus>,
    #[serde(default)]
    pub effective_date: Option<NaiveDate>,
}

impl CreatePolicyRequest {
    pub fn into_policy(self, created_by: Id) -> Result<NewPolicy> {
        let now = Utc::now();
        Ok(NewPolicy {
            title: required("title", &self.title)?,
            description: required("description", &self.description)?,
            content: required("content", &self.content)?,
            category: required("category", &self.category)?,
            policy_type: self.policy_type,
            status: self.status.unwrap_or_default(),
            effective_date: self.effective_date,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Changes to an existing policy. Unset fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePolicyRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub status: Option<PolicyStatus>,
    pub effective_date: Option<NaiveDate>,
}

impl UpdatePolicyRequest {
    /// Apply the changes, or none of them if any is invalid.
    pub fn apply_to(self, policy: &mut PolicyCore, at: DateTime<Utc>) -> Result<()> {
        let title = self.title.map(|t| required("title", &t)).transpose()?;
        let description = self
            .description
            .map(|d| required("description", &d))
            .transpose()?;
        let content = self.content.map(|c| required("content", &c)).transpose()?;
        let category = self.category.map(|c| required("category", &c)).transpose()?;

        if let Some(title) = title {
            policy.title = title;
        }
        if let Some(description) = description {
            policy.description = description;
        }
        if let Some(content) = content {
            policy.content = content;
        }
        if let Some(category) = category {
            policy.category = category;
        }
        if let Some(status) = self.status {
            policy.status = status;
        }
        if let Some(date) = self.effective_date {
            policy.effective_date = Some(date);
        }
        policy.updated_at = at;
        Ok(())
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CreatePolicyRequest {
        pub fn example() -> Self {
            Self {
                title: "Perda Pengelolaan Sampah".to_string(),
                description: "Pengurangan dan penanganan sampah rumah tangga".to_string(),
                content: "Pasal 1. Setiap rumah tangga wajib memilah sampah.".to_string(),
                category: "lingkungan".to_string(),
                policy_type: PolicyType::Perda,
                status: None,
                effective_date: NaiveDate::from_ymd_opt(2025, 1, 1),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_policies_are_drafts() {
        let creator = Id::new();
        let policy = CreatePolicyRequest::example().into_policy(creator).unwrap();
        assert_eq!(policy.status, PolicyStatus::Draft);
        assert_eq!(policy.created_by, creator);

        let mut blank = CreatePolicyRequest::example();
        blank.content = "  ".to_string();
        assert!(blank.into_policy(creator).is_err());
    }

    #[test]
    fn invalid_update_changes_nothing() {
        let mut policy = CreatePolicyRequest::example().into_policy(Id::new()).unwrap();
        let before = policy.clone();
        let update = UpdatePolicyRequest {
            title: Some("Perda Baru".to_string()),
            category: Some(String::new()),
            ..Default::default()
        };
        assert!(update.apply_to(&mut policy, Utc::now()).is_err());
        assert_eq!(policy, before);

        let update = UpdatePolicyRequest {
            status: Some(PolicyStatus::Approved),
            ..Default::default()
        };
        update.apply_to(&mut policy, Utc::now()).unwrap();
        assert_eq!(policy.status, PolicyStatus::Approved);
        assert_eq!(policy.title, before.title);
    }
}
