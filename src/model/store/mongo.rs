use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use mongodb::{
    bson::{self, doc},
    error::{Error as MongoError, TRANSIENT_TRANSACTION_ERROR, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    options::FindOptions,
    Client, ClientSession, Database,
};
use rocket::{futures::TryStreamExt, tokio::time::sleep};

use crate::model::{
    identity::{Identity, NewIdentity, Verification},
    mongodb::{is_duplicate_key_error, Coll, Id},
    poll::{Ballot, NewBallot, NewPoll, Poll, PollOption, PollStatus},
    policy::{NewPolicy, Policy, PolicyFilter},
    report::{NewReport, Report},
};

use super::{
    BallotCommit, IdentityStore, PolicyStore, PollStore, ReportStore, StorageError,
    VerificationCommit,
};

/// How many times a transaction is run before a transient failure is reported.
const MAX_TRANSACTION_ATTEMPTS: u32 = 10;

/// Pause between attempts, multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(5);

fn is_transient(e: &MongoError) -> bool {
    e.contains_label(TRANSIENT_TRANSACTION_ERROR)
}

/// Commit the session's transaction, retrying while its outcome is unknown.
async fn commit_with_retry(session: &mut ClientSession) -> Result<(), MongoError> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Err(e)
                if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                    && attempt < MAX_TRANSACTION_ATTEMPTS =>
            {
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// MongoDB-backed storage.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub fn new(client: Client, db: Database) -> Self {
        Self { client, db }
    }

    fn coll<T: crate::model::mongodb::MongoCollection>(&self) -> Coll<T> {
        Coll::from_db(&self.db)
    }

    /// The writes of [`PollStore::commit_ballot`], run inside `session`'s transaction.
    /// Returns early with a non-recorded outcome if any precondition fails.
    async fn commit_ballot_in(
        &self,
        session: &mut ClientSession,
        ballot: NewBallot,
        close_poll: bool,
    ) -> Result<BallotCommit, StorageError> {
        // Re-check the poll status inside the transaction, closing it if asked.
        let active = doc! {
            "_id": ballot.poll_id,
            "status": PollStatus::Active,
        };
        let poll_ok = if close_poll {
            let update = doc! {
                "$set": {
                    "status": PollStatus::Completed,
                    "closed_at": bson::DateTime::from_chrono(ballot.voted_at),
                }
            };
            self.coll::<Poll>()
                .update_one_with_session(active, update, None, session)
                .await?
                .matched_count
                == 1
        } else {
            self.coll::<Poll>()
                .find_one_with_session(active, None, session)
                .await?
                .is_some()
        };
        if !poll_ok {
            return Ok(BallotCommit::PollClosed);
        }

        // The unique (poll_id, identity_id) index closes the race with concurrent voters.
        let inserted = self
            .coll::<NewBallot>()
            .insert_one_with_session(&ballot, None, session)
            .await;
        let ballot_id: Id = match inserted {
            Ok(result) => result
                .inserted_id
                .as_object_id()
                .expect("IDs are generated by the database")
                .into(),
            Err(e) if is_duplicate_key_error(&e) => return Ok(BallotCommit::AlreadyVoted),
            Err(e) => return Err(e.into()),
        };

        let option_filter = doc! {
            "_id": ballot.option_id,
            "poll_id": ballot.poll_id,
        };
        let update = doc! { "$inc": { "votes": 1 } };
        let result = self
            .coll::<PollOption>()
            .update_one_with_session(option_filter, update, None, session)
            .await?;
        if result.matched_count != 1 {
            return Ok(BallotCommit::OptionMissing);
        }

        Ok(BallotCommit::Recorded(Ballot {
            id: ballot_id,
            ballot,
        }))
    }
}

#[rocket::async_trait]
impl IdentityStore for MongoStore {
    async fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StorageError> {
        let id: Id = self
            .coll::<NewIdentity>()
            .insert_one(&identity, None)
            .await?
            .inserted_id
            .as_object_id()
            .expect("IDs are generated by the database")
            .into();
        Ok(Identity { id, identity })
    }

    async fn identity(&self, id: Id) -> Result<Option<Identity>, StorageError> {
        Ok(self.coll::<Identity>().find_one(id.as_doc(), None).await?)
    }

    async fn identity_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Identity>, StorageError> {
        let filter = doc! { "username": username };
        Ok(self.coll::<Identity>().find_one(filter, None).await?)
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, StorageError> {
        let filter = doc! { "email": email };
        Ok(self.coll::<Identity>().find_one(filter, None).await?)
    }

    async fn set_verification(
        &self,
        id: Id,
        verification: &Verification,
    ) -> Result<VerificationCommit, StorageError> {
        let update = doc! {
            "$set": {
                "nik": verification.nik.as_str(),
                "nik_verified": true,
                "locality": &verification.locality,
                "district": &verification.district,
            }
        };
        // The partial unique index on verified NIKs refuses a second holder.
        match self
            .coll::<Identity>()
            .update_one(id.as_doc(), update, None)
            .await
        {
            Ok(result) if result.matched_count == 1 => Ok(VerificationCommit::Recorded),
            Ok(_) => Ok(VerificationCommit::UnknownIdentity),
            Err(e) if is_duplicate_key_error(&e) => Ok(VerificationCommit::NikInUse),
            Err(e) => Err(e.into()),
        }
    }
}

#[rocket::async_trait]
impl PollStore for MongoStore {
    async fn insert_poll(
        &self,
        poll: NewPoll,
        options: Vec<String>,
    ) -> Result<(Poll, Vec<PollOption>), StorageError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let id: Id = self
            .coll::<NewPoll>()
            .insert_one_with_session(&poll, None, &mut session)
            .await?
            .inserted_id
            .as_object_id()
            .expect("IDs are generated by the database")
            .into();
        let options: Vec<_> = options
            .into_iter()
            .map(|text| PollOption::new(id, text))
            .collect();
        if !options.is_empty() {
            self.coll::<PollOption>()
                .insert_many_with_session(&options, None, &mut session)
                .await?;
        }

        session.commit_transaction().await?;
        Ok((Poll { id, poll }, options))
    }

    async fn polls(&self) -> Result<Vec<Poll>, StorageError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let polls = self
            .coll::<Poll>()
            .find(None, options)
            .await?
            .try_collect()
            .await?;
        Ok(polls)
    }

    async fn poll(&self, id: Id) -> Result<Option<Poll>, StorageError> {
        Ok(self.coll::<Poll>().find_one(id.as_doc(), None).await?)
    }

    async fn options(&self, poll_id: Id) -> Result<Vec<PollOption>, StorageError> {
        // ObjectIds are increasing, so this is creation order.
        let options = FindOptions::builder().sort(doc! { "_id": 1 }).build();
        let found = self
            .coll::<PollOption>()
            .find(doc! { "poll_id": poll_id }, options)
            .await?
            .try_collect()
            .await?;
        Ok(found)
    }

    async fn option_in_poll(
        &self,
        option_id: Id,
        poll_id: Id,
    ) -> Result<Option<PollOption>, StorageError> {
        let filter = doc! {
            "_id": option_id,
            "poll_id": poll_id,
        };
        Ok(self.coll::<PollOption>().find_one(filter, None).await?)
    }

    async fn has_ballot(&self, poll_id: Id, identity_id: Id) -> Result<bool, StorageError> {
        let filter = doc! {
            "poll_id": poll_id,
            "identity_id": identity_id,
        };
        let count = self
            .coll::<Ballot>()
            .count_documents(filter, None)
            .await?;
        Ok(count > 0)
    }

    async fn commit_ballot(
        &self,
        ballot: NewBallot,
        close_poll: bool,
    ) -> Result<BallotCommit, StorageError> {
        let mut session = self.client.start_session(None).await?;
        let mut attempt = 1;
        loop {
            session.start_transaction(None).await?;
            let result = match self
                .commit_ballot_in(&mut session, ballot.clone(), close_poll)
                .await
            {
                Ok(BallotCommit::Recorded(ballot)) => commit_with_retry(&mut session)
                    .await
                    .map(|()| BallotCommit::Recorded(ballot)),
                Ok(outcome) => {
                    session.abort_transaction().await?;
                    return Ok(outcome);
                }
                Err(StorageError::Db(e)) => {
                    let _ = session.abort_transaction().await;
                    Err(e)
                }
                Err(e) => {
                    let _ = session.abort_transaction().await;
                    return Err(e);
                }
            };

            // A conflicting concurrent ballot aborts the whole transaction;
            // re-running it observes the winner's committed writes.
            match result {
                Err(e) if is_transient(&e) && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    debug!(
                        "Retrying ballot on poll {} after transient failure: {e}",
                        ballot.poll_id
                    );
                    sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                result => return Ok(result?),
            }
        }
    }

    async fn close_poll(&self, poll_id: Id, at: DateTime<Utc>) -> Result<bool, StorageError> {
        let filter = doc! {
            "_id": poll_id,
            "status": PollStatus::Active,
        };
        let update = doc! {
            "$set": {
                "status": PollStatus::Completed,
                "closed_at": bson::DateTime::from_chrono(at),
            }
        };
        let result = self
            .coll::<Poll>()
            .update_one(filter, update, None)
            .await?;
        Ok(result.modified_count == 1)
    }
}

#[rocket::async_trait]
impl PolicyStore for MongoStore {
    async fn insert_policy(&self, policy: NewPolicy) -> Result<Policy, StorageError> {
        let id: Id = self
            .coll::<NewPolicy>()
            .insert_one(&policy, None)
            .await?
            .inserted_id
            .as_object_id()
            .expect("IDs are generated by the database")
            .into();
        Ok(Policy { id, policy })
    }

    async fn policies(&self, filter: &PolicyFilter) -> Result<Vec<Policy>, StorageError> {
        let mut query = doc! {};
        if let Some(status) = filter.status {
            query.insert("status", status);
        }
        if let Some(category) = &filter.category {
            query.insert("category", category.as_str());
        }
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let policies = self
            .coll::<Policy>()
            .find(query, options)
            .await?
            .try_collect()
            .await?;
        Ok(policies)
    }

    async fn policy(&self, id: Id) -> Result<Option<Policy>, StorageError> {
        Ok(self.coll::<Policy>().find_one(id.as_doc(), None).await?)
    }

    async fn replace_policy(&self, policy: &Policy) -> Result<bool, StorageError> {
        let result = self
            .coll::<Policy>()
            .replace_one(policy.id.as_doc(), policy, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_policy(&self, id: Id) -> Result<bool, StorageError> {
        let result = self
            .coll::<Policy>()
            .delete_one(id.as_doc(), None)
            .await?;
        Ok(result.deleted_count == 1)
    }
}

#[rocket::async_trait]
impl ReportStore for MongoStore {
    async fn insert_report(&self, report: NewReport) -> Result<Report, StorageError> {
        let id: Id = self
            .coll::<NewReport>()
            .insert_one(&report, None)
            .await?
            .inserted_id
            .as_object_id()
            .expect("IDs are generated by the database")
            .into();
        Ok(Report { id, report })
    }

    async fn reports(&self, filed_by: Option<Id>) -> Result<Vec<Report>, StorageError> {
        let filter = filed_by.map(|id| doc! { "identity_id": id });
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let reports = self
            .coll::<Report>()
            .find(filter, options)
            .await?
            .try_collect()
            .await?;
        Ok(reports)
    }

    async fn report(&self, id: Id) -> Result<Option<Report>, StorageError> {
        Ok(self.coll::<Report>().find_one(id.as_doc(), None).await?)
    }

    async fn replace_report(&self, report: &Report) -> Result<bool, StorageError> {
        let result = self
            .coll::<Report>()
            .replace_one(report.id.as_doc(), report, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_report(&self, id: Id) -> Result<bool, StorageError> {
        let result = self
            .coll::<Report>()
            .delete_one(id.as_doc(), None)
            .await?;
        Ok(result.deleted_count == 1)
    }
}
