//! Error handling

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
    http::{header, HeaderValue, StatusCode},
    Json,
};
use jsonwebtoken::errors::ErrorKind;
use serde_json::json;

use crate::domain::FeatureError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Auth errors
    TokenExpired,
    TokenInvalid,
    Unauthorized,
    Forbidden(String),

    // Resource errors
    NotFound(String),

    // Validation errors
    ValidationError(String),

    // Feature core errors
    Feature(FeatureError),

    // Database errors
    DatabaseError(String),

    // Generic errors
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token has expired".to_string()),
            AppError::TokenInvalid => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ValidationError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Feature(err) => return feature_error_response(err),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred".to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let mut response = (status, error_body(status, &error_message)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

fn error_body(status: StatusCode, message: &str) -> Json<serde_json::Value> {
    Json(json!({
        "error": message,
        "status": status.as_u16()
    }))
}

fn feature_error_response(err: FeatureError) -> Response {
    let status = match &err {
        FeatureError::LayerNotFound(_) | FeatureError::FeatureNotFound(_) => StatusCode::NOT_FOUND,
        FeatureError::VersionMismatch { .. } => StatusCode::CONFLICT,
        FeatureError::UnknownStorageMapping(_)
        | FeatureError::GeometryTypeMismatch { .. }
        | FeatureError::InvalidGeometry(_)
        | FeatureError::MalformedBbox(_)
        | FeatureError::NoChangesSupplied => StatusCode::UNPROCESSABLE_ENTITY,
        FeatureError::CorruptStoredGeometry(_) | FeatureError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    match err {
        FeatureError::VersionMismatch { feature_id, request_version, current_version } => {
            let body = Json(json!({
                "type": "VERSION_MISMATCH",
                "featureId": feature_id.to_string(),
                "requestVersion": request_version,
                "currentVersion": current_version,
                "message": "Feature was modified by another user; re-fetch and retry",
            }));
            (status, body).into_response()
        }
        FeatureError::UnknownStorageMapping(detail) => {
            tracing::error!("Layer storage mapping error: {}", detail);
            (status, error_body(status, "Layer storage is not configured correctly")).into_response()
        }
        FeatureError::CorruptStoredGeometry(detail) => {
            tracing::error!("Corrupt stored geometry: {}", detail);
            (status, error_body(status, "Internal server error")).into_response()
        }
        FeatureError::Storage(e) => {
            tracing::error!("Database error: {}", e);
            (status, error_body(status, "Database error occurred")).into_response()
        }
        other => (status, error_body(status, &other.to_string())).into_response(),
    }
}

impl From<FeatureError> for AppError {
    fn from(err: FeatureError) -> Self {
        AppError::Feature(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::TokenInvalid,
        }
    }
}

// Extractor rejections (see handlers::extract)
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
