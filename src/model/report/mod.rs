//! Citizen reports: complaints and requests filed by constituents and
//! worked through by administrators.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{self, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::mongodb::Id;

/// States in the report workflow.
///
/// `Pending -> InProgress -> Resolved | Rejected`. A pending report may also
/// be resolved or rejected directly. Resolved and rejected are final.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

impl ReportStatus {
    pub fn is_final(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }

    /// Can a report move from this status to `next`? Staying put is always allowed.
    pub fn can_become(self, next: Self) -> bool {
        self == next
            || match self {
                Self::Pending => true,
                Self::InProgress => next.is_final(),
                Self::Resolved | Self::Rejected => false,
            }
    }
}

impl Display for ReportStatus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}",
            match self {
                Self::Pending => "pending",
                Self::InProgress => "in_progress",
                Self::Resolved => "resolved",
                Self::Rejected => "rejected",
            }
        )
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for ReportPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Reasons a report update is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("A report cannot move from {from} to {to}")]
    InvalidTransition { from: ReportStatus, to: ReportStatus },
}

impl ReportError {
    /// Stable name of the failure, for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "InvalidTransition",
        }
    }
}

/// Core report data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCore {
    /// The constituent who filed the report.
    pub identity_id: Id,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Option<String>,
    pub status: ReportStatus,
    pub priority: ReportPriority,
    pub admin_notes: Option<String>,
    pub resolved_by: Option<Id>,
    #[serde(default)]
    resolved_at: Option<bson::DateTime>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl ReportCore {
    /// A new, pending report.
    pub fn new(
        identity_id: Id,
        title: String,
        description: String,
        category: String,
        location: Option<String>,
        priority: ReportPriority,
    ) -> Self {
        let now = Utc::now();
        Self {
            identity_id,
            title,
            description,
            category,
            location,
            status: ReportStatus::Pending,
            priority,
            admin_notes: None,
            resolved_by: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at.map(|at| at.to_chrono())
    }

    /// Apply an administrator's changes. The first move to `Resolved`
    /// records who resolved the report and when.
    pub fn apply(
        &mut self,
        update: ReportUpdate,
        by: Id,
        at: DateTime<Utc>,
    ) -> Result<(), ReportError> {
        if let Some(status) = update.status {
            if !self.status.can_become(status) {
                return Err(ReportError::InvalidTransition {
                    from: self.status,
                    to: status,
                });
            }
            if status == ReportStatus::Resolved && self.resolved_at.is_none() {
                self.resolved_by = Some(by);
                self.resolved_at = Some(bson::DateTime::from_chrono(at));
            }
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(notes) = update.admin_notes {
            self.admin_notes = Some(notes);
        }
        self.updated_at = at;
        Ok(())
    }
}

/// An administrator's changes to a report. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportUpdate {
    pub status: Option<ReportStatus>,
    pub priority: Option<ReportPriority>,
    pub admin_notes: Option<String>,
}

/// A report without an ID.
pub type NewReport = ReportCore;

/// A report from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub report: ReportCore,
}

impl Deref for Report {
    type Target = ReportCore;

    fn deref(&self) -> &Self::Target {
        &self.report
    }
}

impl DerefMut for Report {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.report
    }
}

/// Counts of reports, overall and broken down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub rejected: u64,
    /// Per category, sorted by category name.
    pub by_category: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<ReportPriority, u64>,
}

impl ReportStats {
    pub fn tally<'a>(reports: impl IntoIterator<Item = &'a ReportCore>) -> Self {
        let mut stats = Self::default();
        for report in reports {
            stats.total += 1;
            *match report.status {
                ReportStatus::Pending => &mut stats.pending,
                ReportStatus::InProgress => &mut stats.in_progress,
                ReportStatus::Resolved => &mut stats.resolved,
                ReportStatus::Rejected => &mut stats.rejected,
            } += 1;
            *stats
                .by_category
                .entry(report.category.clone())
                .or_default() += 1;
            *stats.by_priority.entry(report.priority).or_default() += 1;
        }
        stats
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl ReportCore {
        pub fn example(identity_id: Id) -> Self {
            Self::new(
                identity_id,
                "Jalan berlubang".to_string(),
                "Lubang besar di depan pasar".to_string(),
                "infrastruktur".to_string(),
                Some("Jl. Soekarno-Hatta".to_string()),
                ReportPriority::High,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: ReportStatus) -> ReportUpdate {
        ReportUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    #[test]
    fn workflow_moves_forward_only() {
        use ReportStatus::*;
        assert!(Pending.can_become(InProgress));
        assert!(Pending.can_become(Rejected));
        assert!(InProgress.can_become(Resolved));
        assert!(!InProgress.can_become(Pending));
        assert!(!Resolved.can_become(InProgress));
        assert!(!Rejected.can_become(Resolved));
        assert!(Resolved.can_become(Resolved));
    }

    #[test]
    fn resolving_records_resolver_once() {
        let mut report = ReportCore::example(Id::new());
        let admin = Id::new();
        let later = Id::new();

        report
            .apply(status(ReportStatus::InProgress), admin, Utc::now())
            .unwrap();
        assert_eq!(report.resolved_by, None);

        let resolved_at = Utc::now();
        report
            .apply(status(ReportStatus::Resolved), admin, resolved_at)
            .unwrap();
        assert_eq!(report.resolved_by, Some(admin));
        assert!(report.resolved_at().is_some());

        // Notes can still be added, but the resolver stays.
        let notes = ReportUpdate {
            status: Some(ReportStatus::Resolved),
            admin_notes: Some("Sudah ditambal".to_string()),
            ..Default::default()
        };
        report.apply(notes, later, Utc::now()).unwrap();
        assert_eq!(report.resolved_by, Some(admin));
        assert_eq!(report.admin_notes.as_deref(), Some("Sudah ditambal"));
    }

    #[test]
    fn refused_transition_changes_nothing() {
        let mut report = ReportCore::example(Id::new());
        report
            .apply(status(ReportStatus::Rejected), Id::new(), Utc::now())
            .unwrap();
        let before = report.clone();

        let update = ReportUpdate {
            status: Some(ReportStatus::Pending),
            priority: Some(ReportPriority::Low),
            admin_notes: None,
        };
        let result = report.apply(update, Id::new(), Utc::now());
        assert_eq!(
            result,
            Err(ReportError::InvalidTransition {
                from: ReportStatus::Rejected,
                to: ReportStatus::Pending,
            })
        );
        assert_eq!(report, before);
    }

    #[test]
    fn stats_count_each_dimension() {
        let identity = Id::new();
        let mut reports = vec![
            ReportCore::example(identity),
            ReportCore::example(identity),
            ReportCore::example(identity),
        ];
        reports[1].category = "pelayanan".to_string();
        reports[1].priority = ReportPriority::Low;
        reports[2].status = ReportStatus::InProgress;

        let stats = ReportStats::tally(&reports);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.resolved, 0);
        assert_eq!(stats.by_category["infrastruktur"], 2);
        assert_eq!(stats.by_category["pelayanan"], 1);
        assert_eq!(stats.by_priority[&ReportPriority::High], 2);
        assert_eq!(stats.by_priority[&ReportPriority::Low], 1);
    }
}
