use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crawlmark_core::CrawlError;
use serde_json::json;

/// Error returned by the API handlers.
#[derive(Debug)]
pub enum ApiError {
    Crawl(CrawlError),
    /// A blocking conversion task panicked or was cancelled.
    Task(tokio::task::JoinError),
}

impl From<CrawlError> for ApiError {
    fn from(err: CrawlError) -> Self {
        ApiError::Crawl(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Task(err)
    }
}

impl ApiError {
    pub fn required(field: &str) -> Self {
        ApiError::Crawl(CrawlError::Validation(format!("{field} is required")))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Crawl(CrawlError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Crawl(err) if err.is_fetch_error() => StatusCode::BAD_GATEWAY,
            ApiError::Crawl(CrawlError::InvalidUrl(_) | CrawlError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Crawl(CrawlError::NotExtractable) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error class reported in the `error` field.
    pub fn class(&self) -> &'static str {
        match self {
            ApiError::Crawl(err) if err.is_fetch_error() => "FetchError",
            ApiError::Crawl(CrawlError::InvalidUrl(_) | CrawlError::Validation(_)) => "ValidationError",
            ApiError::Crawl(CrawlError::NotExtractable) => "ExtractionError",
            ApiError::Crawl(CrawlError::ConversionFault(_)) => "ConversionFault",
            _ => "InternalError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Crawl(CrawlError::Validation(message)) => json!({ "error": message }),
            ApiError::Crawl(err) => json!({ "error": self.class(), "message": err.to_string() }),
            ApiError::Task(err) => json!({ "error": self.class(), "message": err.to_string() }),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %body, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %body, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CrawlError::Timeout { timeout: 30 }, StatusCode::GATEWAY_TIMEOUT, "FetchError"),
            (
                CrawlError::FetchStatus { url: "https://e.com".into(), status: 404, reason: "Not Found".into() },
                StatusCode::BAD_GATEWAY,
                "FetchError",
            ),
            (CrawlError::InvalidUrl("x".into()), StatusCode::BAD_REQUEST, "ValidationError"),
            (CrawlError::Validation("url is required".into()), StatusCode::BAD_REQUEST, "ValidationError"),
            (CrawlError::NotExtractable, StatusCode::UNPROCESSABLE_ENTITY, "ExtractionError"),
            (CrawlError::ConversionFault("depth".into()), StatusCode::INTERNAL_SERVER_ERROR, "ConversionFault"),
        ];

        for (err, status, class) in cases {
            let err = ApiError::from(err);
            assert_eq!(err.status(), status);
            assert_eq!(err.class(), class);
        }
    }

    #[tokio::test]
    async fn test_validation_body() {
        let response = ApiError::required("url").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "url is required" }));
    }

    #[tokio::test]
    async fn test_not_extractable_body() {
        let response = ApiError::from(CrawlError::NotExtractable).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "ExtractionError");
        assert!(body["message"].as_str().unwrap().contains("not extractable"));
    }
}
