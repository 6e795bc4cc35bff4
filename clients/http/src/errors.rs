//! # Error Translation
//!
//! Every failure raised while serving a request converges on
//! [`ErrorTranslator::translate`], the only place that decides the status code
//! and body for validation, storage and unclassified errors.

use actix_web::{error::PayloadError, http::StatusCode, HttpRequest, HttpResponse};
use database::{persistence::storage::StorageError, validation::ValidationError};
use thiserror::Error;

use crate::response::{ErrorResponse, ValidationErrorResponse};

const UNAVAILABLE_MESSAGE: &str = "Database connection error. Please try again later.";
const CONSTRAINT_MESSAGE: &str = "Database constraint violation";
const INTERNAL_MESSAGE: &str = "Internal server error";

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Request body exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize },

    #[error("Failed to read request body: {0}")]
    Body(#[from] PayloadError),
}

impl ApiError {
    /// Status the error declares for itself, before the store specific rules apply
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Body(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Message plus cause chain
    fn stack(&self) -> String {
        match self {
            ApiError::Storage(e) => format!("{:?}", e.inner()),
            other => format!("{:?}", other),
        }
    }
}

/// Controls how much of an unclassified failure is exposed to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunMode {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct ErrorTranslator {
    run_mode: RunMode,
}

impl ErrorTranslator {
    pub fn new(run_mode: RunMode) -> Self {
        Self { run_mode }
    }

    pub fn respond(&self, req: &HttpRequest, result: ApiResult<HttpResponse>) -> HttpResponse {
        result.unwrap_or_else(|error| self.translate(req, error))
    }

    pub fn translate(&self, req: &HttpRequest, error: ApiError) -> HttpResponse {
        let error = match error {
            ApiError::Validation(e) => {
                log::warn!(
                    "Validation error: {:?} [method: {}, url: {}]",
                    e.messages,
                    req.method(),
                    req.uri()
                );

                return HttpResponse::BadRequest()
                    .json(ValidationErrorResponse::new(e.messages));
            }
            error => error,
        };

        log::error!(
            "Unhandled error: {} [method: {}, url: {}, ip: {}]\n{}",
            error,
            req.method(),
            req.uri(),
            peer_ip(req),
            error.stack()
        );

        match &error {
            ApiError::Storage(StorageError::Unavailable(_)) => HttpResponse::ServiceUnavailable()
                .json(ErrorResponse::new(UNAVAILABLE_MESSAGE, None)),
            ApiError::Storage(StorageError::ConstraintViolation(_)) => {
                HttpResponse::BadRequest().json(ErrorResponse::new(CONSTRAINT_MESSAGE, None))
            }
            _ => {
                let body = match self.run_mode {
                    RunMode::Development => {
                        ErrorResponse::new(error.to_string(), Some(error.stack()))
                    }
                    RunMode::Production => ErrorResponse::new(INTERNAL_MESSAGE, None),
                };

                HttpResponse::build(error.status_code()).json(body)
            }
        }
    }
}

fn peer_ip(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
