use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::Json;
use shared::{ErrorCode, ErrorResponse, ValidationError};
use thiserror::Error;
use tracing::error;
use crate::{
    ledger::LedgerError,
    raffle::RaffleError,
    session::AuthError,
    store::StoreError,
};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(ValidationError),
    #[error("{0}")]
    Conflict(ValidationError),
    #[error("{0}")]
    NotFound(String),
    #[error("Store schema mismatch: {0}")]
    Schema(String),
    #[error("Row store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("Row store rejected this service: {0}")]
    StoreRejected(String),
    #[error("{0}")]
    Unauthorized(#[from] AuthError),
    #[error("{0}")]
    RateLimited(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Schema(_) => Status::InternalServerError,
            ApiError::StoreUnavailable(_) => Status::ServiceUnavailable,
            ApiError::StoreRejected(_) => Status::BadGateway,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::RateLimited(_) => Status::TooManyRequests,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Validation(_) => ErrorCode::InvalidInput,
            ApiError::Conflict(_) => ErrorCode::Conflict,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::Schema(_) => ErrorCode::SchemaMismatch,
            ApiError::StoreUnavailable(_) | ApiError::StoreRejected(_) => ErrorCode::StoreUnavailable,
            ApiError::Unauthorized(_) => ErrorCode::Unauthorized,
            ApiError::RateLimited(_) => ErrorCode::RateLimited,
            ApiError::Internal(_) => ErrorCode::SystemError,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        if e.is_duplicate() { ApiError::Conflict(e) } else { ApiError::Validation(e) }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Connectivity(_) | StoreError::Malformed(_) => ApiError::StoreUnavailable(e.to_string()),
            StoreError::Unauthorized(_) => ApiError::StoreRejected(e.to_string()),
            StoreError::TableNotFound(_) => ApiError::Schema(e.to_string()),
            StoreError::InvalidRow(_) | StoreError::InvalidColumn(_) | StoreError::LockFailed => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Invalid(v) => v.into(),
            LedgerError::MemberNotFound(_) => ApiError::NotFound(e.to_string()),
            LedgerError::MalformedPoints { .. } | LedgerError::Schema(_) => ApiError::Schema(e.to_string()),
            LedgerError::Store(s) => s.into(),
        }
    }
}

impl From<RaffleError> for ApiError {
    fn from(e: RaffleError) -> Self {
        match e {
            RaffleError::Invalid(v) => v.into(),
            RaffleError::Schema(_) => ApiError::Schema(e.to_string()),
            RaffleError::Store(s) => s.into(),
            RaffleError::PartialCommit { .. } => ApiError::StoreUnavailable(e.to_string()),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        if status.code >= 500 {
            error!("{} {} failed: {}", req.method(), req.uri(), self);
        }

        rocket::Response::build_from(Json(ErrorResponse::new(self.code(), self.to_string())).respond_to(req)?)
            .status(status)
            .ok()
    }
}
