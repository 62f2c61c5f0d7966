use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Failures raised by the users table itself.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Backend(#[from] sqlx::Error),
}

/// Single field that failed request validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Everything a user operation can fail with. Each variant maps to exactly one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    NotFound(String),
    #[error("A user with this email already exists")]
    DuplicateEmail,
    #[error("Invalid email or password")]
    AuthFailed,
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<StoreError> for UserError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConstraintViolation(_) => UserError::DuplicateEmail,
            StoreError::InvalidArgument(msg) => UserError::InvalidArgument(msg),
            StoreError::Backend(e) => UserError::Storage(e.into()),
        }
    }
}

impl From<JsonRejection> for UserError {
    fn from(rejection: JsonRejection) -> Self {
        UserError::InvalidArgument(rejection.body_text())
    }
}

impl From<QueryRejection> for UserError {
    fn from(rejection: QueryRejection) -> Self {
        UserError::InvalidArgument(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl UserError {
    pub fn status(&self) -> StatusCode {
        match self {
            UserError::InvalidArgument(_) | UserError::Validation(_) => StatusCode::BAD_REQUEST,
            UserError::NotFound(_) => StatusCode::NOT_FOUND,
            UserError::DuplicateEmail => StatusCode::CONFLICT,
            UserError::AuthFailed => StatusCode::UNAUTHORIZED,
            UserError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            UserError::InvalidArgument(_) => "Bad Request",
            UserError::Validation(_) => "Validation Failed",
            UserError::NotFound(_) => "Not Found",
            UserError::DuplicateEmail => "Conflict",
            UserError::AuthFailed => "Unauthorized",
            UserError::Storage(_) => "Internal Server Error",
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            UserError::Storage(e) => {
                // Backend details stay in the logs.
                error!(error = %e, "storage failure");
                "An unexpected error occurred".to_string()
            }
            UserError::Validation(_) => "Request validation failed".to_string(),
            other => other.to_string(),
        };
        let category = self.category();
        let details = match self {
            UserError::Validation(details) => Some(details),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            error: category,
            message,
            details,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn render(err: UserError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), 64 * 1024)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn storage_failure_hides_backend_message() {
        let (status, body) =
            render(UserError::Storage(anyhow::anyhow!("disk I/O error at /var/db"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Internal Server Error");
        assert!(!body["message"].as_str().unwrap().contains("disk"));
    }

    #[tokio::test]
    async fn validation_error_lists_details() {
        let (status, body) = render(UserError::Validation(vec![FieldError {
            field: "email",
            message: "Valid email is required",
        }]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation Failed");
        assert_eq!(body["details"][0]["field"], "email");
        assert_eq!(body["details"][0]["message"], "Valid email is required");
    }

    #[tokio::test]
    async fn taxonomy_maps_to_statuses() {
        assert_eq!(UserError::AuthFailed.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(UserError::DuplicateEmail.status(), StatusCode::CONFLICT);
        assert_eq!(
            UserError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        let (_, body) = render(UserError::NotFound("No user found with ID 7".into())).await;
        assert!(body.get("details").is_none());
        assert_eq!(body["message"], "No user found with ID 7");
    }

    #[test]
    fn constraint_violation_becomes_duplicate_email() {
        let err: UserError = StoreError::ConstraintViolation("UNIQUE".into()).into();
        assert!(matches!(err, UserError::DuplicateEmail));
    }
}
