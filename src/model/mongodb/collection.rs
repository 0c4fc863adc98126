use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::{
    district::{District, Official},
    identity::{Identity, NewIdentity},
    poll::{Ballot, NewBallot, NewPoll, Poll, PollOption},
    policy::{NewPolicy, Policy},
    report::{NewReport, Report},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Identity collections
const USERS: &str = "users";
impl MongoCollection for Identity {
    const NAME: &'static str = USERS;
}
impl MongoCollection for NewIdentity {
    const NAME: &'static str = USERS;
}

// Poll collections
const POLLS: &str = "polls";
impl MongoCollection for Poll {
    const NAME: &'static str = POLLS;
}
impl MongoCollection for NewPoll {
    const NAME: &'static str = POLLS;
}

const POLL_OPTIONS: &str = "poll_options";
impl MongoCollection for PollOption {
    const NAME: &'static str = POLL_OPTIONS;
}

// Ballot collections
const VOTES: &str = "votes";
impl MongoCollection for Ballot {
    const NAME: &'static str = VOTES;
}
impl MongoCollection for NewBallot {
    const NAME: &'static str = VOTES;
}

// Policy collections
const POLICIES: &str = "policies";
impl MongoCollection for Policy {
    const NAME: &'static str = POLICIES;
}
impl MongoCollection for NewPolicy {
    const NAME: &'static str = POLICIES;
}

// Report collections
const REPORTS: &str = "reports";
impl MongoCollection for Report {
    const NAME: &'static str = REPORTS;
}
impl MongoCollection for NewReport {
    const NAME: &'static str = REPORTS;
}

// Reference data
impl MongoCollection for District {
    const NAME: &'static str = "districts";
}
impl MongoCollection for Official {
    const NAME: &'static str = "officials";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Users collection.
    for key in ["username", "email"] {
        let index = IndexModel::builder()
            .keys(doc! { key: 1 })
            .options(unique.clone())
            .build();
        Coll::<Identity>::from_db(db)
            .create_index(index, None)
            .await?;
    }
    // A NIK may back at most one verified placement.
    let verified_nik = IndexOptions::builder()
        .unique(true)
        .partial_filter_expression(doc! { "nik_verified": true })
        .build();
    let nik_index = IndexModel::builder()
        .keys(doc! { "nik": 1 })
        .options(verified_nik)
        .build();
    Coll::<Identity>::from_db(db)
        .create_index(nik_index, None)
        .await?;

    // Votes collection: one ballot per identity per poll.
    let vote_index = IndexModel::builder()
        .keys(doc! { "poll_id": 1, "identity_id": 1 })
        .options(unique.clone())
        .build();
    Coll::<Ballot>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    // Poll options are looked up by poll.
    let option_index = IndexModel::builder()
        .keys(doc! { "poll_id": 1 })
        .build();
    Coll::<PollOption>::from_db(db)
        .create_index(option_index, None)
        .await?;

    // Reports are listed per filer.
    let report_index = IndexModel::builder()
        .keys(doc! { "identity_id": 1, "created_at": -1 })
        .build();
    Coll::<Report>::from_db(db)
        .create_index(report_index, None)
        .await?;

    // Districts collection.
    let district_index = IndexModel::builder()
        .keys(doc! { "name": 1 })
        .options(unique)
        .build();
    Coll::<District>::from_db(db)
        .create_index(district_index, None)
        .await?;

    Ok(())
}
