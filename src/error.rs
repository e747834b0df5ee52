use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FarmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Push delivery error: {0}")]
    Push(String),
}

impl FarmError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FarmError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        FarmError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            FarmError::Validation { .. } => "validation",
            FarmError::NotFound { .. } => "not_found",
            FarmError::Unauthorized(_) => "unauthorized",
            FarmError::Forbidden(_) => "forbidden",
            FarmError::Conflict(_) => "conflict",
            FarmError::Backend { .. } | FarmError::Http(_) => "backend",
            FarmError::Push(_) => "push",
            _ => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            FarmError::Validation { .. } | FarmError::Json(_) => StatusCode::BAD_REQUEST,
            FarmError::NotFound { .. } => StatusCode::NOT_FOUND,
            FarmError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FarmError::Forbidden(_) => StatusCode::FORBIDDEN,
            FarmError::Conflict(_) => StatusCode::CONFLICT,
            FarmError::Backend { .. } | FarmError::Http(_) | FarmError::Push(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FarmError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for FarmError {
    fn from(rejection: JsonRejection) -> Self {
        FarmError::validation("body", rejection.body_text())
    }
}

impl From<PathRejection> for FarmError {
    fn from(rejection: PathRejection) -> Self {
        FarmError::validation("path", rejection.body_text())
    }
}

impl From<QueryRejection> for FarmError {
    fn from(rejection: QueryRejection) -> Self {
        FarmError::validation("query", rejection.body_text())
    }
}

pub type Result<T> = std::result::Result<T, FarmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        assert_eq!(
            FarmError::validation("ear_tag", "required").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FarmError::not_found("sow", Uuid::nil()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            FarmError::Backend { status: 500, message: "boom".into() }.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            FarmError::Config("missing".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_message_names_field() {
        let err = FarmError::validation("born_alive", "must not be negative");
        assert_eq!(err.to_string(), "Invalid born_alive: must not be negative");
    }
}
