use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use qa_types::ValidationError;
use serde_json::json;
use utoipa::ToSchema;

use crate::store::StoreError;

#[derive(Debug, ToSchema)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// A collaborator answered with a failure status; it is passed through.
    Upstream { status: u16, message: String },
    InternalServerError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg) => msg,
            ApiError::Upstream { message, .. } => message,
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "request failed: {}", message);
        }

        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Conflict(_) => ApiError::Conflict(err.to_string()),
            StoreError::Remote { status, message } => ApiError::Upstream { status, message },
            StoreError::Database(_) | StoreError::Http(_) | StoreError::Internal(_) => {
                ApiError::InternalServerError(err.to_string())
            }
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
