use chrono::{
    serde::{ts_seconds, ts_seconds_option},
    DateTime, Utc,
};
use rocket::http::Status;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    mongodb::Id,
    poll::{Ballot, NewPoll, Poll, PollOption, PollStatus},
};

/// The fewest options a poll may offer.
pub const MIN_OPTIONS: usize = 2;

/// An API-friendly poll, with its options and running tallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub status: PollStatus,
    pub created_by: String,
    #[serde(with = "ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "ts_seconds_option")]
    pub closed_at: Option<DateTime<Utc>>,
    pub options: Vec<OptionView>,
    pub total_votes: u64,
}

impl PollView {
    pub fn new(poll: Poll, options: Vec<PollOption>) -> Self {
        let options: Vec<OptionView> = options.into_iter().map(OptionView::from).collect();
        Self {
            id: poll.id.to_string(),
            closed_at: poll.closed_at(),
            total_votes: options.iter().map(|o| o.votes).sum(),
            options,
            created_by: poll.created_by.to_string(),
            created_at: poll.created_at,
            status: poll.status,
            title: poll.poll.title,
            description: poll.poll.description,
            category: poll.poll.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    pub id: String,
    pub text: String,
    pub votes: u64,
}

impl From<PollOption> for OptionView {
    fn from(option: PollOption) -> Self {
        Self {
            id: option.id.to_string(),
            text: option.text,
            votes: option.votes,
        }
    }
}

/// A request to create a new, active poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePollRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    pub options: Vec<String>,
}

impl CreatePollRequest {
    /// Check the request, producing the poll and its option texts.
    pub fn into_poll(self, created_by: Id) -> Result<(NewPoll, Vec<String>)> {
        let title = self.title.trim();
        let category = self.category.trim();
        if title.is_empty() || category.is_empty() {
            return Err(Error::Status(
                Status::BadRequest,
                "Title and category are required".to_string(),
            ));
        }
        let options: Vec<String> = self
            .options
            .iter()
            .map(|o| o.trim().to_string())
            .collect();
        if options.len() < MIN_OPTIONS || options.iter().any(String::is_empty) {
            return Err(Error::Status(
                Status::BadRequest,
                format!("At least {MIN_OPTIONS} non-empty options are required"),
            ));
        }

        let poll = NewPoll::new(
            title.to_string(),
            self.description,
            category.to_string(),
            created_by,
        );
        Ok((poll, options))
    }
}

/// A request to vote for one option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub option_id: String,
}

/// Confirmation of a recorded ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotReceipt {
    pub ballot_id: String,
    pub poll_id: String,
    pub option_id: String,
    #[serde(with = "ts_seconds")]
    pub voted_at: DateTime<Utc>,
}

impl From<Ballot> for BallotReceipt {
    fn from(ballot: Ballot) -> Self {
        Self {
            ballot_id: ballot.id.to_string(),
            poll_id: ballot.poll_id.to_string(),
            option_id: ballot.option_id.to_string(),
            voted_at: ballot.voted_at,
        }
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CreatePollRequest {
        pub fn example() -> Self {
            Self {
                title: "Prioritas Pembangunan 2025".to_string(),
                description: "Manakah yang harus diprioritaskan tahun depan?".to_string(),
                category: "infrastruktur".to_string(),
                options: vec![
                    "Jalan dan jembatan".to_string(),
                    "Drainase".to_string(),
                    "Ruang terbuka hijau".to_string(),
                ],
            }
        }
    }
}
