use crate::db::errors::DbError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{collections::BTreeMap, fmt};
use thiserror::Error as ThisError;
use utoipa::ToSchema;

/// Key used for validation errors that are not tied to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field-level validation messages, keyed by field name.
///
/// Serializes to `{"email": ["Enter a valid email address."], ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single message for a single field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fail with [`Error::Validation`] if any message was collected
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() { Ok(()) } else { Err(Error::Validation { errors: self }) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            write!(f, "{field}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}

#[derive(ThisError, Debug)]
pub enum Error {
    /// Request payload failed validation
    #[error("Invalid input: {errors}")]
    Validation { errors: FieldErrors },

    /// Credentials were presented but could not be accepted
    #[error("Not authenticated")]
    Unauthenticated {
        message: Option<String>,
        /// Authentication scheme to advertise in `WWW-Authenticate`
        challenge: Option<String>,
    },

    /// No authenticated user, or the user may not perform the operation
    #[error("Permission denied: {message}")]
    PermissionDenied {
        message: String,
        /// Set when the request could succeed with credentials; turns the response into a 401
        challenge: Option<String>,
    },

    /// Request body could not be read or parsed
    #[error("{message}")]
    BadRequest { message: String },

    /// Request body is not JSON
    #[error("{message}")]
    UnsupportedMediaType { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::PermissionDenied { challenge: Some(_), .. } => StatusCode::UNAUTHORIZED,
            Error::PermissionDenied { challenge: None, .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { errors } => errors.to_string(),
            Error::Unauthenticated { message, .. } => message.clone().unwrap_or_else(|| "Invalid token.".to_string()),
            Error::PermissionDenied { message, .. } => message.clone(),
            Error::BadRequest { message } | Error::UnsupportedMediaType { message } => message.clone(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { table, constraint, .. } => match (table.as_deref(), constraint.as_deref()) {
                    (Some("users"), Some(c)) if c.contains("email") => "user with this email already exists.".to_string(),
                    _ => "Resource already exists".to_string(),
                },
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }

    fn challenge(&self) -> Option<&str> {
        match self {
            Error::Unauthenticated { challenge, .. } | Error::PermissionDenied { challenge, .. } => challenge.as_deref(),
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::PermissionDenied { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::Validation { .. } | Error::BadRequest { .. } | Error::UnsupportedMediaType { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        let challenge = self.challenge().and_then(|c| HeaderValue::from_str(c).ok());

        let mut response = match self {
            // Validation errors are returned field by field
            Error::Validation { errors } => (status, Json(errors)).into_response(),
            other => (status, Json(json!({ "detail": other.user_message() }))).into_response(),
        };

        if let Some(challenge) = challenge {
            response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
        }
        response
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            // Field types are checked by the request models, so this is a body that is not an object
            JsonRejection::JsonDataError(_) => Error::Validation {
                errors: FieldErrors::single(NON_FIELD_ERRORS, "Invalid data. Expected a dictionary."),
            },
            JsonRejection::JsonSyntaxError(err) => Error::BadRequest {
                message: format!("JSON parse error - {}", err.body_text()),
            },
            JsonRejection::MissingJsonContentType(_) => Error::UnsupportedMediaType {
                message: "Unsupported media type in request. Expected `application/json`.".to_string(),
            },
            other => Error::BadRequest { message: other.body_text() },
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
