use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// API-layer error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 - Request rejected before it reaches the core
    #[error("{0}")]
    Validation(String),

    /// 404 - Provider has no data for the requested symbol
    #[error("{message}: {details}")]
    NotFound { message: String, details: String },

    /// 500 - Unexpected failure
    #[error("{message}: {details}")]
    Internal { message: String, details: String },
}

/// JSON error envelope
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, message, Some(details))
            }
            ApiError::Internal { message, details } => {
                tracing::error!(%details, "{message}");
                (StatusCode::INTERNAL_SERVER_ERROR, message, Some(details))
            }
        };

        let body = ErrorBody {
            success: false,
            error,
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_envelope_has_no_details() {
        let response = ApiError::Validation("Invalid request".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Invalid request");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn test_internal_envelope_carries_details() {
        let response = ApiError::Internal {
            message: "Failed to fetch stock price".into(),
            details: "Provider unavailable for INFY.NS: HTTP error: 503".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Failed to fetch stock price");
        assert_eq!(
            json["details"],
            "Provider unavailable for INFY.NS: HTTP error: 503"
        );
    }
}
