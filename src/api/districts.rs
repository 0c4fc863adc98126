use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::district::{DistrictDetail, DistrictSummary},
        district::{DistrictRegistry, Official},
    },
};

pub fn routes() -> Vec<Route> {
    routes![districts, district, district_officials]
}

#[get("/districts")]
pub fn districts(registry: &State<DistrictRegistry>) -> Json<Vec<DistrictSummary>> {
    Json(registry.districts().iter().map(DistrictSummary::from).collect())
}

#[get("/districts/<name>")]
pub fn district(name: &str, registry: &State<DistrictRegistry>) -> Result<Json<DistrictDetail>> {
    let district = registry
        .district(name)
        .ok_or_else(|| Error::not_found(format!("District '{name}'")))?;
    Ok(Json(district.into()))
}

#[get("/districts/<name>/officials")]
pub fn district_officials(
    name: &str,
    registry: &State<DistrictRegistry>,
) -> Result<Json<Vec<Official>>> {
    let officials = registry
        .officials_for(name)
        .ok_or_else(|| Error::not_found(format!("District '{name}'")))?;
    Ok(Json(officials.into_iter().cloned().collect()))
}
