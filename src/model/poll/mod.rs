//! Polls, their options, and the ballots cast on them.

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{
    self, serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson,
};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

mod ledger;
pub use ledger::{cast_ballot, close_poll, VoteError, VotePolicy};

/// States in the poll lifecycle. The only transition is `Active -> Completed`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    /// Accepting ballots.
    Active,
    /// Closed; no further ballots are accepted.
    #[serde(alias = "ended")]
    Completed,
}

impl From<PollStatus> for Bson {
    fn from(status: PollStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// Core poll data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollCore {
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: PollStatus,
    pub created_by: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    closed_at: Option<bson::DateTime>,
}

impl PollCore {
    /// A new, active poll.
    pub fn new(title: String, description: String, category: String, created_by: Id) -> Self {
        Self {
            title,
            description,
            category,
            status: PollStatus::Active,
            created_by,
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PollStatus::Active
    }

    /// When the poll was closed, if it has been.
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at.map(|at| at.to_chrono())
    }

    /// Transition to `Completed`, stamping the close time.
    pub fn close(&mut self, at: DateTime<Utc>) {
        self.status = PollStatus::Completed;
        self.closed_at = Some(bson::DateTime::from_chrono(at));
    }
}

/// A poll without an ID.
pub type NewPoll = PollCore;

/// A poll from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub poll: PollCore,
}

impl Deref for Poll {
    type Target = PollCore;

    fn deref(&self) -> &Self::Target {
        &self.poll
    }
}

impl DerefMut for Poll {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.poll
    }
}

/// A choice within a poll, with its running tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    #[serde(rename = "_id")]
    pub id: Id,
    pub poll_id: Id,
    pub text: String,
    /// Equal to the number of ballots referencing this option.
    pub votes: u64,
}

impl PollOption {
    pub fn new(poll_id: Id, text: String) -> Self {
        Self {
            id: Id::new(),
            poll_id,
            text,
            votes: 0,
        }
    }
}

/// Core ballot data: one identity's vote on one option of one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotCore {
    pub poll_id: Id,
    pub option_id: Id,
    pub identity_id: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub voted_at: DateTime<Utc>,
}

/// A ballot without an ID.
pub type NewBallot = BallotCore;

/// A ballot from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Deref for Ballot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl PollCore {
        pub fn example(created_by: Id) -> Self {
            Self::new(
                "Prioritas Pembangunan 2025".to_string(),
                "Manakah yang harus diprioritaskan tahun depan?".to_string(),
                "infrastruktur".to_string(),
                created_by,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::serde::json::serde_json;

    #[test]
    fn status_accepts_legacy_name() {
        let status: PollStatus = serde_json::from_str("\"ended\"").unwrap();
        assert_eq!(status, PollStatus::Completed);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"completed\"");
        assert_eq!(Bson::from(PollStatus::Active), Bson::String("active".into()));
    }
}
