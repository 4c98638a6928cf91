//! Error types for the HTTP surface
//!
//! Maps catalog outcomes to status codes using thiserror and axum's
//! `IntoResponse`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::catalog::CatalogError;
use crate::models::ErrorResponse;

// == Api Error Enum ==
/// Error returned by every handler.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input
    #[error("{0}")]
    InvalidInput(String),

    #[error("Product not found")]
    NotFound,

    /// Store failure. The message is logged, never sent to the client.
    #[error("{context}: {message}")]
    StoreFailure {
        context: &'static str,
        message: String,
    },
}

impl ApiError {
    /// Converts a catalog error, labelling store failures with `context`
    /// (for example "Failed to fetch product").
    pub fn from_catalog(err: CatalogError, context: &'static str) -> Self {
        match err {
            CatalogError::InvalidInput(msg) => ApiError::InvalidInput(msg),
            CatalogError::NotFound(_) => ApiError::NotFound,
            CatalogError::Store(e) => ApiError::StoreFailure {
                context,
                message: e.to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::StoreFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::StoreFailure { context, message } => {
                error!(error = %message, "{}", context);
                context.to_string()
            }
            other => other.to_string(),
        };

        (self.status(), Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_catalog_errors_map_to_status() {
        let cases = [
            (CatalogError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (CatalogError::NotFound(3), StatusCode::NOT_FOUND),
            (
                CatalogError::Store(StoreError::Unavailable("db down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from_catalog(err, "Failed").status(), status);
        }
    }

    #[tokio::test]
    async fn test_store_failure_hides_details() {
        let err = ApiError::from_catalog(
            CatalogError::Store(StoreError::Unavailable("password=secret".into())),
            "Failed to fetch products",
        );

        let response = err.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();

        assert_eq!(body, r#"{"error":"Failed to fetch products"}"#);
    }
}
