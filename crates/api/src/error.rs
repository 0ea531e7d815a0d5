use agency_cms_core::CoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error type rendered as a JSON error envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::Authorship => ApiError::Unauthorized(err.to_string()),
            CoreError::Validation(e) => ApiError::Unprocessable(e.to_string()),
            CoreError::Reference(e) => ApiError::Unprocessable(e.to_string()),
            CoreError::NotFound(what) => ApiError::NotFound(what.clone()),
            CoreError::VersionConflict { .. } => ApiError::Conflict(err.to_string()),
            CoreError::PasswordHash(_) | CoreError::Database(_) | CoreError::Serialization(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "notFound", msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validationError", msg.clone())
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internalError",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": {
                "type": error_type,
                "message": message,
                "statusCode": status.as_u16(),
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Convenience type alias for route handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use agency_cms_core::content::validate::ValidationError;
    use agency_cms_core::content::ContentRef;

    use super::*;

    fn status_of(err: CoreError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn core_errors_map_to_statuses() {
        let reference = "widget:1".parse::<ContentRef>().unwrap_err();
        assert_eq!(status_of(reference.into()), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_of(ValidationError::PatchNotObject.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_of(CoreError::Authorship), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(CoreError::not_found("version 9")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(CoreError::VersionConflict { subject: "page:1".into() }),
            StatusCode::CONFLICT
        );
    }
}
