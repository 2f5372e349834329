//! # Error Handling for CRUD Controllers
//!
//! Every failure that ends a request is a [`ControllerError`]. It maps to an
//! HTTP status code, sends a sanitized message to the client and logs the
//! internal details through `tracing`.
//!
//! Validation and persistence failures are *not* controller errors: the edit
//! action recovers from them locally and re-renders the form (see
//! [`crate::validation::ValidationErrors`] and [`crate::core::SaveError`]).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crudaction::ControllerError;
//!
//! fn check(action: CrudAction, config: &ActionConfig) -> Result<(), ControllerError> {
//!     if !config.is_enabled(action) {
//!         return Err(ControllerError::action_disabled("Post", action));
//!     }
//!     Ok(())
//! }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use std::fmt;

use crate::config::CrudAction;

/// Controller error with automatic logging and sanitized responses
#[derive(Debug)]
pub enum ControllerError {
    /// 404 Not Found - disabled or unknown action, or a required record is missing
    NotFound {
        /// Resource type (e.g., "Post", "Post edit action")
        resource: String,
        /// Optional identifier that wasn't found
        id: Option<String>,
    },

    /// 400 Bad Request - the request could not be read
    BadRequest {
        /// User-facing error message
        message: String,
    },

    /// 500 Internal Server Error - the controller is set up in a way this crate
    /// does not support (composite primary keys)
    UnsupportedConfiguration {
        /// Description of the misconfiguration (logged, not sent to user)
        message: String,
    },

    /// 500 Internal Server Error - Database error (details logged, not exposed)
    Database {
        /// User-facing generic message
        message: String,
        /// Internal error (logged, not sent to user)
        internal: DbErr,
    },

    /// 500 Internal Server Error - Generic internal error
    Internal {
        /// User-facing generic message
        message: String,
        /// Internal error details (logged, not sent to user)
        internal: Option<String>,
    },
}

impl ControllerError {
    /// Create a 404 Not Found error
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ControllerError::not_found("Post", Some(id.to_string())));
    /// ```
    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id,
        }
    }

    /// Create the 404 reported when an action is not enabled for a controller
    #[must_use]
    pub fn action_disabled(model_name: &str, action: CrudAction) -> Self {
        Self::NotFound {
            resource: format!("{model_name} {action} action"),
            id: None,
        }
    }

    /// Create a 400 Bad Request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Create an unsupported-configuration error
    ///
    /// # Example
    /// ```rust,ignore
    /// return Err(ControllerError::unsupported("composite keys are not supported"));
    /// ```
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            message: message.into(),
        }
    }

    /// Create a 500 Internal Server Error from a database error
    ///
    /// The database error details are logged but NOT sent to the user.
    #[must_use]
    pub fn database(err: DbErr) -> Self {
        Self::Database {
            message: "A database error occurred".to_string(),
            internal: err,
        }
    }

    /// Create a 500 Internal Server Error with optional details
    pub fn internal(message: impl Into<String>, internal: Option<String>) -> Self {
        Self::Internal {
            message: message.into(),
            internal,
        }
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::UnsupportedConfiguration { .. }
            | Self::Database { .. }
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the user-facing error message (sanitized)
    fn user_message(&self) -> String {
        match self {
            Self::NotFound { resource, id } => {
                if let Some(id) = id {
                    format!("{resource} with ID '{id}' not found")
                } else {
                    format!("{resource} not found")
                }
            }
            Self::BadRequest { message }
            | Self::Database { message, .. }
            | Self::Internal { message, .. } => message.clone(),
            Self::UnsupportedConfiguration { .. } => "Internal server error".to_string(),
        }
    }

    /// Log internal error details (not sent to user)
    fn log_internal(&self) {
        match self {
            Self::UnsupportedConfiguration { message } => {
                tracing::error!(details = %message, "Unsupported controller configuration");
            }
            Self::Database { internal, .. } => {
                tracing::error!(error = ?internal, "Database error occurred");
            }
            Self::Internal {
                internal: Some(details),
                ..
            } => {
                tracing::error!(details = %details, "Internal error occurred");
            }
            _ => {
                tracing::debug!(
                    error = %self.user_message(),
                    status = %self.status_code(),
                    "Controller error"
                );
            }
        }
    }
}

/// Error response sent to users (sanitized)
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ControllerError {
    fn into_response(self) -> Response {
        self.log_internal();

        let status = self.status_code();
        let body = ErrorResponse {
            error: self.user_message(),
        };

        (status, Json(body)).into_response()
    }
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Display is for logs and tests, so keep the real reason here
            Self::UnsupportedConfiguration { message } => write!(f, "{message}"),
            _ => write!(f, "{}", self.user_message()),
        }
    }
}

impl std::error::Error for ControllerError {}

/// Convert SeaORM `DbErr` to `ControllerError`
///
/// - `DbErr::RecordNotFound` → 404 Not Found
/// - All other `DbErr` variants → 500 (logged internally, sanitized for users)
impl From<DbErr> for ControllerError {
    fn from(err: DbErr) -> Self {
        match &err {
            DbErr::RecordNotFound(msg) => {
                let resource = msg.split_whitespace().next().unwrap_or("Resource");
                Self::NotFound {
                    resource: resource.to_string(),
                    id: None,
                }
            }
            _ => Self::database(err),
        }
    }
}
