use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::repo::RepoError;
use crate::service::AuthError;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Validation failed")] Validation(String),
    #[error("Email already exists")] Conflict,
    #[error("Invalid credentials")] Unauthorized,
    #[error("not found")] NotFound,
    #[error("Forbidden")] Forbidden(&'static str),
    /// The edge-security check itself failed.
    #[error("Internal server error")] SecurityUnavailable,
    #[error("Internal server error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Internal(_) => ApiError::Internal,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::DuplicateEmail => ApiError::Conflict,
            AuthError::NotFound => ApiError::NotFound,
            AuthError::InvalidCredential => ApiError::Unauthorized,
            AuthError::Hashing(_) => ApiError::Internal,
            AuthError::Repo(e) => e.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::Validation(format_validation_errors(&e))
    }
}

/// Flattens field errors into `"field: code, field: code"`.
pub fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(msg) => format!("{field}: {msg}"),
                None => format!("{field}: {}", e.code),
            })
        })
        .collect();
    parts.sort();
    parts.join(", ")
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::SecurityUnavailable | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (message, details) = match self {
            ApiError::Validation(d) => (None, Some(d.clone())),
            ApiError::Forbidden(m) => (Some(m.to_string()), None),
            ApiError::SecurityUnavailable => {
                (Some("Something went wrong with security middleware.".to_string()), None)
            }
            _ => (None, None),
        };
        HttpResponse::build(self.status_code()).json(ApiErrorBody {
            error: self.to_string(),
            message,
            details,
        })
    }
}
