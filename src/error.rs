use log::error;
use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::logging::RequestId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The client sent a malformed identifier or payload.
    #[error("Bad request: {0}")]
    Validation(String),
    /// The referenced question does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The store rejected a write or could not be reached.
    #[error(transparent)]
    Persistence(#[from] DbError),
    /// A listing could not be assembled.
    #[error("Failed to read questions: {0}")]
    Read(#[source] DbError),
    /// The store is missing state the server set up itself, e.g. an ID counter.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::Persistence(_) | Self::Read(_) | Self::Internal(_) => {
                Status::InternalServerError
            }
        }
    }

    /// The message shown to the client. Store failures are not described in
    /// detail; the full cause only goes to the server log.
    fn public_message(&self) -> String {
        match self {
            Self::Persistence(_) => "Failed to persist question changes".to_string(),
            Self::Read(_) => "Failed to fetch questions".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Wire format of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.class().is_server_error() {
            let id = req.local_cache(RequestId::next);
            error!("req{id}: {self}");
        }
        let body = Json(ErrorBody {
            error: self.public_message(),
        });
        (status, body).respond_to(req)
    }
}
