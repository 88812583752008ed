use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ogp_core::OgpError;
use serde_json::json;

/// Error body returned by every endpoint: `{"success": false, "error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    details: Vec<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(error: &OgpError) -> StatusCode {
    match error {
        OgpError::Validation(_) => StatusCode::BAD_REQUEST,
        OgpError::GameNotFound { .. } | OgpError::UserNotFound { .. } => StatusCode::NOT_FOUND,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<OgpError> for ApiError {
    fn from(error: OgpError) -> Self {
        let status = status_for(&error);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", error);
        }

        let details = match &error {
            OgpError::Validation(problems) => problems.clone(),
            _ => Vec::new(),
        };

        Self {
            status,
            message: error.to_string(),
            details,
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self::bad_request(format!("Invalid multipart body: {}", error.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = if self.details.is_empty() {
            json!({ "success": false, "error": self.message })
        } else {
            json!({ "success": false, "error": self.message, "details": self.details })
        };
        (self.status, Json(body)).into_response()
    }
}
