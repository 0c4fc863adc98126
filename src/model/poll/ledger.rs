//! Enforcement of the one-ballot-per-identity rule.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::model::{
    identity::AuthenticatedIdentity,
    mongodb::Id,
    store::{BallotCommit, PollStore, StorageError},
};

use super::{Ballot, NewBallot};

/// Policy switches for ballot casting.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
pub struct VotePolicy {
    /// Close a poll as soon as it receives its first ballot.
    #[serde(default)]
    pub close_on_first_vote: bool,
}

/// Reasons a ballot is refused.
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("NIK verification is required before voting")]
    VerificationRequired,
    #[error("Poll {0} not found")]
    PollNotFound(Id),
    #[error("Poll {0} is not active")]
    PollClosed(Id),
    #[error("Already voted on poll {0}")]
    DuplicateVote(Id),
    #[error("Option {option} does not belong to poll {poll}")]
    InvalidOption { poll: Id, option: Id },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl VoteError {
    /// Stable name of the failure, for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::VerificationRequired => "VerificationRequired",
            Self::PollNotFound(_) => "PollNotFound",
            Self::PollClosed(_) => "PollClosed",
            Self::DuplicateVote(_) => "DuplicateVote",
            Self::InvalidOption { .. } => "InvalidOption",
            Self::Storage(_) => "StorageFailure",
        }
    }
}

/// Cast a ballot for `option_id` in `poll_id` on behalf of `ctx`.
///
/// Checks run in a fixed order and the first failure wins. On success the
/// ballot insert, the option's counter increment, and (under
/// [`VotePolicy::close_on_first_vote`]) the poll's closure are committed as
/// one unit; the store re-checks uniqueness and poll status inside that
/// unit, so a lost race is reported the same way as a failed pre-check.
pub async fn cast_ballot(
    polls: &dyn PollStore,
    ctx: &AuthenticatedIdentity,
    poll_id: Id,
    option_id: Id,
    policy: VotePolicy,
) -> Result<Ballot, VoteError> {
    if !ctx.is_verified() {
        return Err(VoteError::VerificationRequired);
    }

    let poll = polls
        .poll(poll_id)
        .await?
        .ok_or(VoteError::PollNotFound(poll_id))?;
    if !poll.is_active() {
        return Err(VoteError::PollClosed(poll_id));
    }

    if polls.has_ballot(poll_id, ctx.id()).await? {
        return Err(VoteError::DuplicateVote(poll_id));
    }

    let invalid_option = || VoteError::InvalidOption {
        poll: poll_id,
        option: option_id,
    };
    polls
        .option_in_poll(option_id, poll_id)
        .await?
        .ok_or_else(invalid_option)?;

    let ballot = NewBallot {
        poll_id,
        option_id,
        identity_id: ctx.id(),
        voted_at: Utc::now(),
    };
    match polls
        .commit_ballot(ballot, policy.close_on_first_vote)
        .await?
    {
        BallotCommit::Recorded(ballot) => {
            info!("Ballot {} recorded on poll {}", ballot.id, poll_id);
            Ok(ballot)
        }
        BallotCommit::AlreadyVoted => {
            debug!("Concurrent duplicate ballot on poll {poll_id} refused at commit");
            Err(VoteError::DuplicateVote(poll_id))
        }
        BallotCommit::PollClosed => Err(VoteError::PollClosed(poll_id)),
        BallotCommit::OptionMissing => Err(invalid_option()),
    }
}

/// Close an active poll. Returns `false` if it does not exist or was already closed.
pub async fn close_poll(
    polls: &dyn PollStore,
    poll_id: Id,
    at: DateTime<Utc>,
) -> Result<bool, StorageError> {
    let closed = polls.close_poll(poll_id, at).await?;
    if closed {
        info!("Poll {poll_id} closed");
    }
    Ok(closed)
}
