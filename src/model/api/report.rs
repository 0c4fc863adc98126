use chrono::{
    serde::{ts_seconds, ts_seconds_option},
    DateTime, Utc,
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    mongodb::Id,
    report::{NewReport, Report, ReportPriority, ReportStatus},
};

/// An API-friendly report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportView {
    pub id: String,
    pub identity_id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub status: ReportStatus,
    pub priority: ReportPriority,
    pub admin_notes: Option<String>,
    pub resolved_by: Option<String>,
    #[serde(with = "ts_seconds_option")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(with = "ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_seconds")]
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for ReportView {
    fn from(report: Report) -> Self {
        let resolved_at = report.resolved_at();
        let Report { id, report } = report;
        Self {
            id: id.to_string(),
            identity_id: report.identity_id.to_string(),
            title: report.title,
            description: report.description,
            category: report.category,
            location: report.location,
            status: report.status,
            priority: report.priority,
            admin_notes: report.admin_notes,
            resolved_by: report.resolved_by.map(|id| id.to_string()),
            resolved_at,
            created_at: report.created_at,
            updated_at: report.updated_at,
        }
    }
}

/// A constituent's new report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReportRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub priority: Option<ReportPriority>,
}

impl CreateReportRequest {
    pub fn into_report(self, identity_id: Id) -> Result<NewReport> {
        let title = self.title.trim();
        let description = self.description.trim();
        let category = self.category.trim();
        if title.is_empty() || description.is_empty() || category.is_empty() {
            return Err(Error::Status(
                Status::BadRequest,
                "Title, description, and category are required".to_string(),
            ));
        }
        let location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());

        Ok(NewReport::new(
            identity_id,
            title.to_string(),
            description.to_string(),
            category.to_string(),
            location,
            self.priority.unwrap_or_default(),
        ))
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CreateReportRequest {
        pub fn example() -> Self {
            Self {
                title: "Lampu jalan mati".to_string(),
                description: "Tiga lampu jalan mati sejak minggu lalu".to_string(),
                category: "infrastruktur".to_string(),
                location: Some("Jl. Veteran".to_string()),
                priority: None,
            }
        }
    }
}
