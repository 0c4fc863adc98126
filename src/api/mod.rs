use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::ErrorBody;

pub mod auth;
pub mod districts;
pub mod policies;
pub mod polls;
pub mod profile;
pub mod reports;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(profile::routes());
    routes.extend(districts::routes());
    routes.extend(polls::routes());
    routes.extend(policies::routes());
    routes.extend(reports::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Render failures that never reached a handler (bad guards, unmatched
/// routes, malformed bodies) in the same shape as handler errors.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    let reason = status.reason().unwrap_or("Error");
    let body = ErrorBody {
        error: reason.to_string(),
        message: format!("{} {}", status.code, reason),
    };
    (status, Json(body))
}

#[cfg(test)]
mod tests {
    use rocket::{local::asynchronous::Client, serde::json::serde_json};

    use super::*;

    #[backend_test]
    async fn unknown_routes_are_json(client: Client) {
        let response = client.get("/no/such/route").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        let body: ErrorBody =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body.error, "Not Found");
    }
}
