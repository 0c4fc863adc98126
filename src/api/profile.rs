use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::profile::{ProfileView, VerifyNikRequest},
        district::{DistrictRegistry, Official},
        identity::{verify_identity, AuthenticatedIdentity},
        store::Storage,
    },
};

pub fn routes() -> Vec<Route> {
    routes![profile, verify_nik, my_officials]
}

#[get("/profile")]
pub async fn profile(identity: AuthenticatedIdentity) -> Json<ProfileView> {
    Json(identity.into_inner().into())
}

#[post("/profile/verify-nik", data = "<request>", format = "json")]
pub async fn verify_nik(
    identity: AuthenticatedIdentity,
    request: Json<VerifyNikRequest>,
    registry: &State<DistrictRegistry>,
    storage: &State<Storage>,
) -> Result<Json<ProfileView>> {
    let request = request.into_inner();
    let hint = request.district.as_deref().filter(|d| !d.trim().is_empty());
    let verification = verify_identity(
        registry,
        storage.identities.as_ref(),
        &identity,
        &request.nik,
        hint,
    )
    .await?;

    let mut identity = identity.into_inner();
    identity.apply_verification(verification);
    Ok(Json(identity.into()))
}

/// The officials representing the caller's verified district.
#[get("/profile/officials")]
pub async fn my_officials(
    identity: AuthenticatedIdentity,
    registry: &State<DistrictRegistry>,
) -> Result<Json<Vec<Official>>> {
    let verification = identity.verification().ok_or_else(|| {
        Error::Status(
            Status::Forbidden,
            "NIK verification is required to see your representatives".to_string(),
        )
    })?;
    let officials = registry
        .officials_for(&verification.district)
        .ok_or_else(|| Error::not_found(format!("District '{}'", verification.district)))?;
    Ok(Json(officials.into_iter().cloned().collect()))
}
