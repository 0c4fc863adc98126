use std::ops::Deref;

use rocket::{
    http::Status,
    outcome::try_outcome,
    request::{FromRequest, Outcome},
    Request, State,
};

use crate::error::Error;
use crate::logging::RequestIdentity;
use crate::model::{identity::AuthenticatedIdentity, store::Storage};

use super::AuthToken;

/// Load the identity behind the auth cookie, fresh from storage on every
/// request. Missing, unknown, and deactivated identities are all `401`.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedIdentity {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let token = try_outcome!(req.guard::<AuthToken>().await);

        let storage = match req.guard::<&State<Storage>>().await {
            Outcome::Success(storage) => storage,
            _ => {
                return Outcome::Failure((
                    Status::InternalServerError,
                    Error::Status(
                        Status::InternalServerError,
                        "Storage is not managed".to_string(),
                    ),
                ))
            }
        };

        match storage.identities.identity(token.id).await {
            Ok(Some(identity)) if identity.is_active => {
                RequestIdentity::record(req, identity.id, identity.role);
                Outcome::Success(AuthenticatedIdentity::new(identity))
            }
            Ok(_) => Outcome::Failure((
                Status::Unauthorized,
                Error::Status(Status::Unauthorized, "Unknown or inactive user".to_string()),
            )),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}

/// An authenticated identity holding the admin role. Anyone else is `403`.
#[derive(Debug, Clone)]
pub struct Admin(AuthenticatedIdentity);

impl Deref for Admin {
    type Target = AuthenticatedIdentity;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Admin {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let identity = try_outcome!(req.guard::<AuthenticatedIdentity>().await);
        if identity.is_admin() {
            Outcome::Success(Admin(identity))
        } else {
            Outcome::Failure((
                Status::Forbidden,
                Error::Status(Status::Forbidden, "Admin access required".to_string()),
            ))
        }
    }
}
