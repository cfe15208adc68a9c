use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::listings::repo_types::AuctionListing;
use crate::store::StoreError;

pub const BID_REJECTED_MESSAGE: &str = "The bid must be a number bigger than the current price!";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Passwords must match.")]
    PasswordMismatch,

    #[error("Username already taken.")]
    DuplicateUser,

    #[error("Invalid username and/or password.")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Rejected bid; carries the listing so the client can redisplay it.
    #[error("{reason}")]
    InvalidBid {
        reason: String,
        listing: Option<Box<AuctionListing>>,
    },

    #[error("Bidding on this listing is closed.")]
    ListingClosed { listing: Box<AuctionListing> },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn invalid_bid(listing: Option<AuctionListing>) -> Self {
        AppError::InvalidBid {
            reason: BID_REJECTED_MESSAGE.to_string(),
            listing: listing.map(Box::new),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::PasswordMismatch => (StatusCode::BAD_REQUEST, "password_mismatch"),
            AppError::DuplicateUser => (StatusCode::CONFLICT, "duplicate_user"),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::InvalidBid { .. } => (StatusCode::BAD_REQUEST, "invalid_bid"),
            AppError::ListingClosed { .. } => (StatusCode::CONFLICT, "listing_closed"),
            AppError::Store(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        let body = match self {
            AppError::Store(e) => {
                tracing::error!(error = %e, "storage error");
                json!({ "error": code, "message": "Internal server error" })
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                json!({ "error": code, "message": "Internal server error" })
            }
            AppError::InvalidBid { listing, .. } => {
                json!({ "error": code, "message": message, "listing": listing })
            }
            AppError::ListingClosed { listing } => {
                json!({ "error": code, "message": message, "listing": listing })
            }
            _ => json!({ "error": code, "message": message }),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn response_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn validation_returns_400() {
        assert_eq!(
            response_status(AppError::Validation("Title is required".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            response_status(AppError::PasswordMismatch),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn duplicate_user_returns_409() {
        assert_eq!(response_status(AppError::DuplicateUser), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_returns_404() {
        assert_eq!(
            response_status(AppError::NotFound("listing")),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn internal_returns_500() {
        assert_eq!(
            response_status(AppError::Internal(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_match_form_feedback() {
        assert_eq!(AppError::PasswordMismatch.to_string(), "Passwords must match.");
        assert_eq!(AppError::DuplicateUser.to_string(), "Username already taken.");
        assert_eq!(AppError::invalid_bid(None).to_string(), BID_REJECTED_MESSAGE);
    }
}
