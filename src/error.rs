use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum LotError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] figment::Error),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("This client already has that car number registered")]
    DuplicateRegistration,

    #[error("Place is still referenced by registrations")]
    PlaceInUse,

    #[error("Incorrect password")]
    InvalidCredentials,

    #[error("Admin session required")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Input rejected before any write reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("new password is empty")]
    EmptyPassword,

    #[error("new passwords do not match")]
    PasswordMismatch,

    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("unsupported image type `{0}`; expected jpg, jpeg or png")]
    UnsupportedImageType(String),

    #[error("malformed upload: {0}")]
    MalformedUpload(String),
}

impl IntoResponse for LotError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match &self {
            LotError::DatabaseError(_) | LotError::IoError(_) | LotError::ConfigError(_) => {
                error!(error = %self, "request failed with internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred.".to_string(),
                )
            }
            LotError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION", e.to_string()),
            LotError::PayloadTooLarge(_) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", self.to_string())
            }
            LotError::DuplicateRegistration => {
                (StatusCode::CONFLICT, "DUPLICATE", self.to_string())
            }
            LotError::PlaceInUse => (StatusCode::CONFLICT, "PLACE_IN_USE", self.to_string()),
            LotError::InvalidCredentials | LotError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string())
            }
            LotError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
        };
        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
