use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, PartialEq)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("The amount must be a positive number.")]
    InvalidAmount,

    #[error("The amount is not enough to generate a number.")]
    InsufficientAmount,

    #[error("The number of winners must be a positive integer.")]
    InvalidCount,

    #[error("Manual placements must be integers.")]
    InvalidPinnedValue,

    #[error("Manual placement {0} is not a ticket number.")]
    PinnedOutOfRange(i64),

    #[error("Manual placements must be different numbers.")]
    DuplicatePinnedValue,

    #[error(
        "Not enough participants. {needed} winners are needed but only {available} numbers are registered."
    )]
    InsufficientParticipants { needed: usize, available: usize },

    #[error("Cannot issue {requested} numbers, only {available} are left.")]
    TooManyTickets { requested: u64, available: u64 },

    #[error("Number {0} is already taken")]
    StoreConflict(u32),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Could not find a free number after {0} attempts")]
    IssuanceExhausted(u32),
}

impl AppError {
    /// Only a lost insert race is worth retrying with a fresh candidate.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreConflict(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload
            | AppError::InvalidAmount
            | AppError::InsufficientAmount
            | AppError::InvalidCount
            | AppError::InvalidPinnedValue
            | AppError::PinnedOutOfRange(_)
            | AppError::DuplicatePinnedValue
            | AppError::TooManyTickets { .. }
            | AppError::InsufficientParticipants { .. } => StatusCode::BAD_REQUEST,
            AppError::StoreConflict(_)
            | AppError::StoreUnavailable(_)
            | AppError::IssuanceExhausted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            warn!("Request failed: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
