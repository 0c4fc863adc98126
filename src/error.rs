use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{error, warn};
use mongodb::{bson::oid::Error as OidError, error::Error as DbError};
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    district::{RegistryError, ResolveError},
    identity::VerifyError,
    poll::VoteError,
    report::ReportError,
    store::StorageError,
};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error(transparent)]
    OidParse(#[from] OidError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("Not found: {what}"))
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Storage(_) | Self::Db(_) | Self::Registry(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Argon2(_) | Self::OidParse(_) | Self::Resolve(_) => Status::BadRequest,
            Self::Verify(err) => match err {
                VerifyError::Resolve(_) => Status::BadRequest,
                VerifyError::NikInUse => Status::Conflict,
                VerifyError::UnknownIdentity => Status::Unauthorized,
                VerifyError::Storage(_) => Status::InternalServerError,
            },
            Self::Vote(err) => match err {
                VoteError::VerificationRequired => Status::Forbidden,
                VoteError::PollNotFound(_) => Status::NotFound,
                VoteError::PollClosed(_) | VoteError::DuplicateVote(_) => Status::Conflict,
                VoteError::InvalidOption { .. } => Status::BadRequest,
                VoteError::Storage(_) => Status::InternalServerError,
            },
            Self::Report(ReportError::InvalidTransition { .. }) => Status::Conflict,
            Self::Status(status, _) => *status,
        }
    }

    /// Stable name of the failure, for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Storage(_) | Self::Db(_) => "StorageFailure",
            Self::Jwt(_) => "InvalidToken",
            Self::Argon2(_) => "InvalidPassword",
            Self::OidParse(_) => "MalformedId",
            Self::Registry(_) => "InvalidReferenceData",
            Self::Resolve(err) => err.code(),
            Self::Verify(err) => err.code(),
            Self::Vote(err) => err.code(),
            Self::Report(err) => err.code(),
            Self::Status(status, _) => status.reason().unwrap_or("Error"),
        }
    }
}

/// The JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{} {}: {self}", req.method(), req.uri());
        } else {
            warn!("{} {}: {self}", req.method(), req.uri());
        }

        // Internal details stay in the log.
        let message = if status.code >= 500 {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: self.code().to_string(),
            message,
        };
        (status, Json(body)).respond_to(req)
    }
}
