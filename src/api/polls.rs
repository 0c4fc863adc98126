use std::str::FromStr;

use chrono::Utc;
use log::info;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::Admin,
            poll::{BallotReceipt, CreatePollRequest, PollView, VoteRequest},
        },
        identity::AuthenticatedIdentity,
        mongodb::Id,
        poll::{cast_ballot, close_poll, Poll, VoteError},
        store::Storage,
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![polls, poll, create_poll, close, vote]
}

/// Load a poll's options and present it.
async fn view(storage: &Storage, poll: Poll) -> Result<PollView> {
    let options = storage.polls.options(poll.id).await?;
    Ok(PollView::new(poll, options))
}

#[get("/polls")]
pub async fn polls(storage: &State<Storage>) -> Result<Json<Vec<PollView>>> {
    let polls = storage.polls.polls().await?;
    let mut views = Vec::with_capacity(polls.len());
    for poll in polls {
        views.push(view(storage, poll).await?);
    }
    Ok(Json(views))
}

#[get("/polls/<poll_id>")]
pub async fn poll(poll_id: Id, storage: &State<Storage>) -> Result<Json<PollView>> {
    let poll = storage
        .polls
        .poll(poll_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Poll with ID '{poll_id}'")))?;
    Ok(Json(view(storage, poll).await?))
}

#[post("/polls", data = "<request>", format = "json")]
pub async fn create_poll(
    admin: Admin,
    request: Json<CreatePollRequest>,
    storage: &State<Storage>,
) -> Result<(Status, Json<PollView>)> {
    let (poll, options) = request.into_inner().into_poll(admin.id())?;
    let (poll, options) = storage.polls.insert_poll(poll, options).await?;
    info!("Admin {} created poll {}", admin.id(), poll.id);
    Ok((Status::Created, Json(PollView::new(poll, options))))
}

#[post("/polls/<poll_id>/close")]
pub async fn close(_admin: Admin, poll_id: Id, storage: &State<Storage>) -> Result<Json<PollView>> {
    let poll = storage
        .polls
        .poll(poll_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Poll with ID '{poll_id}'")))?;
    if !close_poll(storage.polls.as_ref(), poll.id, Utc::now()).await? {
        return Err(VoteError::PollClosed(poll_id).into());
    }

    let poll = storage
        .polls
        .poll(poll_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Poll with ID '{poll_id}'")))?;
    Ok(Json(view(storage, poll).await?))
}

#[post("/polls/<poll_id>/vote", data = "<request>", format = "json")]
pub async fn vote(
    identity: AuthenticatedIdentity,
    poll_id: Id,
    request: Json<VoteRequest>,
    storage: &State<Storage>,
    config: &State<Config>,
) -> Result<(Status, Json<BallotReceipt>)> {
    let option_id = Id::from_str(&request.option_id)?;
    let ballot = cast_ballot(
        storage.polls.as_ref(),
        &identity,
        poll_id,
        option_id,
        config.vote_policy(),
    )
    .await?;
    Ok((Status::Created, Json(ballot.into())))
}
