use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::model::{
    identity::{Identity, NewIdentity, Verification},
    mongodb::Id,
    poll::{Ballot, NewBallot, NewPoll, Poll, PollOption},
    policy::{NewPolicy, Policy, PolicyFilter},
    report::{NewReport, Report},
};

use super::{
    BallotCommit, IdentityStore, PolicyStore, PollStore, ReportStore, StorageError,
    VerificationCommit,
};

/// An in-process store. Every operation holds one lock for its whole
/// duration, which gives the same all-or-nothing semantics as a database
/// transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    identities: Vec<Identity>,
    polls: Vec<Poll>,
    options: Vec<PollOption>,
    ballots: Vec<Ballot>,
    policies: Vec<Policy>,
    reports: Vec<Report>,
}

impl MemoryStore {
    fn state(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state.lock().map_err(|_| StorageError::Poisoned)
    }
}

#[rocket::async_trait]
impl IdentityStore for MemoryStore {
    async fn insert_identity(&self, identity: NewIdentity) -> Result<Identity, StorageError> {
        let mut state = self.state()?;
        if let Some(clash) = state
            .identities
            .iter()
            .find(|i| i.username == identity.username || i.email == identity.email)
        {
            return Err(StorageError::Constraint(format!(
                "username or email already used by identity {}",
                clash.id
            )));
        }
        let identity = Identity {
            id: Id::new(),
            identity,
        };
        state.identities.push(identity.clone());
        Ok(identity)
    }

    async fn identity(&self, id: Id) -> Result<Option<Identity>, StorageError> {
        Ok(self.state()?.identities.iter().find(|i| i.id == id).cloned())
    }

    async fn identity_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Identity>, StorageError> {
        Ok(self
            .state()?
            .identities
            .iter()
            .find(|i| i.username == username)
            .cloned())
    }

    async fn identity_by_email(&self, email: &str) -> Result<Option<Identity>, StorageError> {
        Ok(self
            .state()?
            .identities
            .iter()
            .find(|i| i.email == email)
            .cloned())
    }

    async fn set_verification(
        &self,
        id: Id,
        verification: &Verification,
    ) -> Result<VerificationCommit, StorageError> {
        let mut state = self.state()?;
        let nik = Some(&verification.nik);
        if state
            .identities
            .iter()
            .any(|i| i.id != id && i.nik_verified && i.nik.as_ref() == nik)
        {
            return Ok(VerificationCommit::NikInUse);
        }
        match state.identities.iter_mut().find(|i| i.id == id) {
            Some(identity) => {
                identity.apply_verification(verification.clone());
                Ok(VerificationCommit::Recorded)
            }
            None => Ok(VerificationCommit::UnknownIdentity),
        }
    }
}

#[rocket::async_trait]
impl PollStore for MemoryStore {
    async fn insert_poll(
        &self,
        poll: NewPoll,
        options: Vec<String>,
    ) -> Result<(Poll, Vec<PollOption>), StorageError> {
        let mut state = self.state()?;
        let poll = Poll { id: Id::new(), poll };
        let options: Vec<_> = options
            .into_iter()
            .map(|text| PollOption::new(poll.id, text))
            .collect();
        state.polls.push(poll.clone());
        state.options.extend(options.iter().cloned());
        Ok((poll, options))
    }

    async fn polls(&self) -> Result<Vec<Poll>, StorageError> {
        let mut polls = self.state()?.polls.clone();
        // Insertion order is creation order.
        polls.reverse();
        Ok(polls)
    }

    async fn poll(&self, id: Id) -> Result<Option<Poll>, StorageError> {
        Ok(self.state()?.polls.iter().find(|p| p.id == id).cloned())
    }

    async fn options(&self, poll_id: Id) -> Result<Vec<PollOption>, StorageError> {
        Ok(self
            .state()?
            .options
            .iter()
            .filter(|o| o.poll_id == poll_id)
            .cloned()
            .collect())
    }

    async fn option_in_poll(
        &self,
        option_id: Id,
        poll_id: Id,
    ) -> Result<Option<PollOption>, StorageError> {
        Ok(self
            .state()?
            .options
            .iter()
            .find(|o| o.id == option_id && o.poll_id == poll_id)
            .cloned())
    }

    async fn has_ballot(&self, poll_id: Id, identity_id: Id) -> Result<bool, StorageError> {
        Ok(self
            .state()?
            .ballots
            .iter()
            .any(|b| b.poll_id == poll_id && b.identity_id == identity_id))
    }

    async fn commit_ballot(
        &self,
        ballot: NewBallot,
        close_poll: bool,
    ) -> Result<BallotCommit, StorageError> {
        let mut state = self.state()?;
        let State {
            polls,
            options,
            ballots,
            ..
        } = &mut *state;

        // Check everything before touching anything.
        let poll = match polls.iter_mut().find(|p| p.id == ballot.poll_id) {
            Some(poll) if poll.is_active() => poll,
            _ => return Ok(BallotCommit::PollClosed),
        };
        if ballots
            .iter()
            .any(|b| b.poll_id == ballot.poll_id && b.identity_id == ballot.identity_id)
        {
            return Ok(BallotCommit::AlreadyVoted);
        }
        let option = match options
            .iter_mut()
            .find(|o| o.id == ballot.option_id && o.poll_id == ballot.poll_id)
        {
            Some(option) => option,
            None => return Ok(BallotCommit::OptionMissing),
        };

        option.votes += 1;
        if close_poll {
            poll.close(ballot.voted_at);
        }
        let ballot = Ballot {
            id: Id::new(),
            ballot,
        };
        ballots.push(ballot.clone());
        Ok(BallotCommit::Recorded(ballot))
    }

    async fn close_poll(&self, poll_id: Id, at: DateTime<Utc>) -> Result<bool, StorageError> {
        let mut state = self.state()?;
        match state.polls.iter_mut().find(|p| p.id == poll_id) {
            Some(poll) if poll.is_active() => {
                poll.close(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[rocket::async_trait]
impl PolicyStore for MemoryStore {
    async fn insert_policy(&self, policy: NewPolicy) -> Result<Policy, StorageError> {
        let policy = Policy {
            id: Id::new(),
            policy,
        };
        self.state()?.policies.push(policy.clone());
        Ok(policy)
    }

    async fn policies(&self, filter: &PolicyFilter) -> Result<Vec<Policy>, StorageError> {
        Ok(self
            .state()?
            .policies
            .iter()
            .rev()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn policy(&self, id: Id) -> Result<Option<Policy>, StorageError> {
        Ok(self.state()?.policies.iter().find(|p| p.id == id).cloned())
    }

    async fn replace_policy(&self, policy: &Policy) -> Result<bool, StorageError> {
        let mut state = self.state()?;
        match state.policies.iter_mut().find(|p| p.id == policy.id) {
            Some(stored) => {
                *stored = policy.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_policy(&self, id: Id) -> Result<bool, StorageError> {
        let mut state = self.state()?;
        let before = state.policies.len();
        state.policies.retain(|p| p.id != id);
        Ok(state.policies.len() < before)
    }
}

#[rocket::async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: NewReport) -> Result<Report, StorageError> {
        let report = Report {
            id: Id::new(),
            report,
        };
        self.state()?.reports.push(report.clone());
        Ok(report)
    }

    async fn reports(&self, filed_by: Option<Id>) -> Result<Vec<Report>, StorageError> {
        Ok(self
            .state()?
            .reports
            .iter()
            .rev()
            .filter(|r| filed_by.map_or(true, |id| r.identity_id == id))
            .cloned()
            .collect())
    }

    async fn report(&self, id: Id) -> Result<Option<Report>, StorageError> {
        Ok(self.state()?.reports.iter().find(|r| r.id == id).cloned())
    }

    async fn replace_report(&self, report: &Report) -> Result<bool, StorageError> {
        let mut state = self.state()?;
        match state.reports.iter_mut().find(|r| r.id == report.id) {
            Some(stored) => {
                *stored = report.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_report(&self, id: Id) -> Result<bool, StorageError> {
        let mut state = self.state()?;
        let before = state.reports.len();
        state.reports.retain(|r| r.id != id);
        Ok(state.reports.len() < before)
    }
}
