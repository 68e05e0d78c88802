use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("already enrolled in this course")]
    AlreadyEnrolled,

    #[error("an approved payment is required for this course")]
    PaymentRequired,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing or malformed caller identity")]
    Unauthenticated,

    #[error("storage error: {0}")]
    Storage(String),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        WorkflowError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::NotFound { .. } => "not_found",
            WorkflowError::Forbidden(_) => "forbidden",
            WorkflowError::AlreadyEnrolled => "already_enrolled",
            WorkflowError::PaymentRequired => "payment_required",
            WorkflowError::InvalidState(_) => "invalid_state",
            WorkflowError::InvalidInput(_) => "invalid_input",
            WorkflowError::Unauthenticated => "unauthenticated",
            WorkflowError::Storage(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Forbidden(_) => StatusCode::FORBIDDEN,
            WorkflowError::AlreadyEnrolled => StatusCode::CONFLICT,
            WorkflowError::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            WorkflowError::InvalidState(_) => StatusCode::CONFLICT,
            WorkflowError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            WorkflowError::Unauthenticated => StatusCode::UNAUTHORIZED,
            WorkflowError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(e: sqlx::Error) -> Self {
        WorkflowError::Storage(e.to_string())
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            WorkflowError::Storage(e) => {
                tracing::error!(error = %e, "internal error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(serde_json::json!({ "error": self.kind(), "message": message }));
        (status, body).into_response()
    }
}
