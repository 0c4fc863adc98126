use chrono::Utc;
use log::info;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::Admin,
            policy::{CreatePolicyRequest, PolicyView, UpdatePolicyRequest},
        },
        mongodb::Id,
        policy::{PolicyFilter, PolicyStatus},
        store::Storage,
    },
};

pub fn routes() -> Vec<Route> {
    routes![policies, policy, create_policy, update_policy, delete_policy]
}

#[get("/policies?<status>&<category>")]
pub async fn policies(
    status: Option<PolicyStatus>,
    category: Option<String>,
    storage: &State<Storage>,
) -> Result<Json<Vec<PolicyView>>> {
    let filter = PolicyFilter { status, category };
    let policies = storage.policies.policies(&filter).await?;
    Ok(Json(policies.into_iter().map(PolicyView::from).collect()))
}

#[get("/policies/<policy_id>")]
pub async fn policy(policy_id: Id, storage: &State<Storage>) -> Result<Json<PolicyView>> {
    let policy = storage
        .policies
        .policy(policy_id)
        .await?
        .ok_or_else(|| Error::not_found(format!("Policy with ID '{policy_id}'")))?;
    Ok(Json(policy.into()))
}

#[post("/policies", data = "<request>", format = "json")]
pub async fn create_policy(
    admin: Admin,
    request: Json<CreatePolicyRequest>,
    storage: &State<Storage>,
) -> Result<(Status, Json<PolicyView>)> {
    let policy = request.into_inner().into_policy(admin.id())?;
    let policy = storage.policies.insert_policy(policy).await?;
    info!("Admin {} created policy {}", admin.id(), policy.id);
    Ok((Status::Created, Json(policy.into())))
}

#[put("/policies/<policy_id>", data = "<request>", format = "json")]
pub async fn update_policy(
    admin: Admin,
    policy_id: Id,
    request: Json<UpdatePolicyRequest>,
    storage: &State<Storage>,
) -> Result<Json<PolicyView>> {
    let not_found = || Error::not_found(format!("Policy with ID '{policy_id}'"));
    let mut policy = storage
        .policies
        .policy(policy_id)
        .await?
        .ok_or_else(not_found)?;
    request.into_inner().apply_to(&mut policy, Utc::now())?;
    if !storage.policies.replace_policy(&policy).await? {
        return Err(not_found());
    }
    info!("Admin {} updated policy {policy_id}", admin.id());
    Ok(Json(policy.into()))
}

#[delete("/policies/<policy_id>")]
pub async fn delete_policy(admin: Admin, policy_id: Id, storage: &State<Storage>) -> Result<Status> {
    if !storage.policies.delete_policy(policy_id).await? {
        return Err(Error::not_found(format!("Policy with ID '{policy_id}'")));
    }
    info!("Admin {} deleted policy {policy_id}", admin.id());
    Ok(Status::NoContent)
}
