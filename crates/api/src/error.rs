//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{DomainError, ErrorKind};
use reviews::ReviewError;

/// API-level error type that maps to HTTP responses.
///
/// The status code is derived from the error's [`ErrorKind`]. Storage
/// failures are logged in full and reported to the client with a generic
/// message.
#[derive(Debug)]
pub enum ApiError {
    /// No usable identity on the request.
    Unauthenticated(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain rule violation.
    Domain(DomainError),
    /// Checkout, cart or catalog failure.
    Checkout(CheckoutError),
    /// Review failure.
    Review(ReviewError),
}

impl ApiError {
    /// Classifies the error. `None` means the caller is unauthenticated.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiError::Unauthenticated(_) => None,
            ApiError::BadRequest(_) => Some(ErrorKind::Validation),
            ApiError::Domain(err) => Some(err.kind()),
            ApiError::Checkout(err) => Some(err.kind()),
            ApiError::Review(err) => Some(err.kind()),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated(msg) | ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Domain(err) => err.to_string(),
            ApiError::Checkout(err) => err.to_string(),
            ApiError::Review(err) => err.to_string(),
        }
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::TransientStorage => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let Some(kind) = self.kind() else {
            let body = serde_json::json!({
                "error": self.message(),
                "kind": "unauthenticated",
                "retryable": false,
            });
            return (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response();
        };

        let message = match kind {
            ErrorKind::TransientStorage => {
                tracing::warn!(error = %self.message(), "transient storage error");
                "Storage temporarily unavailable, please retry".to_string()
            }
            ErrorKind::Internal => {
                tracing::error!(error = %self.message(), "internal server error");
                "Internal server error".to_string()
            }
            _ => self.message(),
        };

        let body = serde_json::json!({
            "error": message,
            "kind": kind.as_str(),
            "retryable": kind.is_retryable(),
        });
        (status_for(kind), axum::Json(body)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        ApiError::Review(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::BookId;
    use store::StoreError;

    #[test]
    fn status_follows_kind() {
        let cases = [
            (
                ApiError::from(CheckoutError::EmptyCart),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(CheckoutError::BookNotFound(BookId::new())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(CheckoutError::InsufficientStock {
                    book_id: BookId::new(),
                    requested: 2,
                    available: 0,
                }),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(CheckoutError::from(StoreError::Unavailable(
                    "pool timed out".to_string(),
                ))),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::from(CheckoutError::from(StoreError::Decode("bad row".to_string()))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Unauthenticated("missing x-user-id header".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
