//! HTTP rendering of `PulseError`.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use pulse_core::error::{ClientCode, PulseError};

/// Wrapper that turns a `PulseError` into a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub PulseError);

impl From<PulseError> for ApiError {
    fn from(e: PulseError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::NotFound => StatusCode::NOT_FOUND,
            ClientCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to clients. Internal details stay in the logs.
    fn public_message(&self) -> &'static str {
        match &self.0 {
            PulseError::NotFound => "Resource not found",
            PulseError::RateLimited { .. } => "Too many requests",
            PulseError::Config(_) | PulseError::InvalidDuration(_) | PulseError::Internal(_) => {
                "Internal server error"
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.public_message(),
            "code": self.0.client_code().as_str(),
        });
        let mut res = (self.status(), Json(body)).into_response();

        if let PulseError::RateLimited { retry_after_secs } = self.0 {
            let secs = retry_after_secs.max(1);
            res.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        res
    }
}
