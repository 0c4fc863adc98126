//! Persistence seams. The core only ever talks to storage through these
//! traits; the server manages one implementation of each in [`Storage`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    identity::{Identity, NewIdentity, Verification},
    mongodb::Id,
    poll::{Ballot, NewBallot, NewPoll, Poll, PollOption},
    policy::{NewPolicy, Policy, PolicyFilter},
    report::{NewReport, Report},
};

mod memory;
pub use memory::MemoryStore;

mod mongo;
pub use mongo::MongoStore;

/// Opaque storage failures. These are never reinterpreted as domain failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    #[error("Constraint violated: {0}")]
    Constraint(String),
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// The outcome of atomically committing a ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BallotCommit {
    /// The ballot was inserted and its option's counter incremented.
    Recorded(Ballot),
    /// The identity already holds a ballot for this poll. Nothing was written.
    AlreadyVoted,
    /// The poll is no longer active. Nothing was written.
    PollClosed,
    /// The option no longer exists in this poll. Nothing was written.
    OptionMissing,
}

/// The outcome of atomically recording a NIK verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationCommit {
    Recorded,
    /// Another identity already holds this NIK. Nothing was written.
    NikInUse,
    /// No identity has the given ID.
    UnknownIdentity,
}

/// Storage for user identities.
#[rocket::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert a new identity, returning it with its assigned ID.
    async fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StorageError>;

    async fn identity(&self, id: Id) -> Result<Option<Identity>, StorageError>;

    async fn identity_by_username(&self, username: &str)
        -> Result<Option<Identity>, StorageError>;

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, StorageError>;

    /// Atomically set `{nik, nik_verified, locality, district}`, unless the
    /// NIK holds a verified placement on a different identity.
    async fn set_verification(
        &self,
        id: Id,
        verification: &Verification,
    ) -> Result<VerificationCommit, StorageError>;
}

/// Storage for polls, their options, and ballots.
#[rocket::async_trait]
pub trait PollStore: Send + Sync {
    /// Insert a poll together with its options, in order.
    async fn insert_poll(
        &self,
        poll: NewPoll,
        options: Vec<String>,
    ) -> Result<(Poll, Vec<PollOption>), StorageError>;

    /// All polls, newest first.
    async fn polls(&self) -> Result<Vec<Poll>, StorageError>;

    async fn poll(&self, id: Id) -> Result<Option<Poll>, StorageError>;

    /// The options of a poll, in creation order.
    async fn options(&self, poll_id: Id) -> Result<Vec<PollOption>, StorageError>;

    /// The option with this ID, only if it belongs to the given poll.
    async fn option_in_poll(
        &self,
        option_id: Id,
        poll_id: Id,
    ) -> Result<Option<PollOption>, StorageError>;

    async fn has_ballot(&self, poll_id: Id, identity_id: Id) -> Result<bool, StorageError>;

    /// Atomically insert the ballot, increment its option's counter, and
    /// optionally close the poll. Either every effect is visible or none is.
    async fn commit_ballot(
        &self,
        ballot: NewBallot,
        close_poll: bool,
    ) -> Result<BallotCommit, StorageError>;

    /// Transition an active poll to completed. Returns `false` if the poll
    /// does not exist or is not active.
    async fn close_poll(&self, poll_id: Id, at: DateTime<Utc>) -> Result<bool, StorageError>;
}

/// Storage for policy documents.
#[rocket::async_trait]
pub trait PolicyStore: Send + Sync {
    async fn insert_policy(&self, policy: NewPolicy) -> Result<Policy, StorageError>;

    /// Policies matching the filter, newest first.
    async fn policies(&self, filter: &PolicyFilter) -> Result<Vec<Policy>, StorageError>;

    async fn policy(&self, id: Id) -> Result<Option<Policy>, StorageError>;

    /// Overwrite a stored policy. Returns `false` if it no longer exists.
    async fn replace_policy(&self, policy: &Policy) -> Result<bool, StorageError>;

    /// Returns `false` if the policy did not exist.
    async fn delete_policy(&self, id: Id) -> Result<bool, StorageError>;
}

/// Storage for citizen reports.
#[rocket::async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, report: NewReport) -> Result<Report, StorageError>;

    /// Reports filed by the given identity, or all reports if `None`, newest first.
    async fn reports(&self, filed_by: Option<Id>) -> Result<Vec<Report>, StorageError>;

    async fn report(&self, id: Id) -> Result<Option<Report>, StorageError>;

    /// Overwrite a stored report. Returns `false` if it no longer exists.
    async fn replace_report(&self, report: &Report) -> Result<bool, StorageError>;

    /// Returns `false` if the report did not exist.
    async fn delete_report(&self, id: Id) -> Result<bool, StorageError>;
}

/// The storage handles placed in managed state.
#[derive(Clone)]
pub struct Storage {
    pub identities: Arc<dyn IdentityStore>,
    pub polls: Arc<dyn PollStore>,
    pub policies: Arc<dyn PolicyStore>,
    pub reports: Arc<dyn ReportStore>,
}

impl Storage {
    /// Storage backed by a single in-process [`MemoryStore`].
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        Self {
            identities: store.clone(),
            polls: store.clone(),
            policies: store.clone(),
            reports: store,
        }
    }

    /// Storage backed by MongoDB.
    pub fn mongo(store: MongoStore) -> Self {
        let store = Arc::new(store);
        Self {
            identities: store.clone(),
            polls: store.clone(),
            policies: store.clone(),
            reports: store,
        }
    }
}
