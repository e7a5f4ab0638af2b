use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::InventoryError;
use crate::store::{StoreError, TICKETS_QR_CODE_KEY, USERS_EMAIL_KEY, USERS_ORG_CNPJ_KEY};
use crate::utils::response::error as error_response;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {message}")]
    ValidationError {
        code: &'static str,
        message: String,
        issues: Vec<FieldIssue>,
    },

    #[error("Authentication error: {message}")]
    AuthError { code: &'static str, message: String },

    #[error("Forbidden: {message}")]
    Forbidden { code: &'static str, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict { code: &'static str, message: String },

    #[error("Rate limited: {message}")]
    RateLimited { code: &'static str, message: String },

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::bad_request("VALIDATION_ERROR", message)
    }

    pub fn invalid_fields(issues: Vec<FieldIssue>) -> Self {
        AppError::ValidationError {
            code: "VALIDATION_ERROR",
            message: "The provided input is invalid".to_string(),
            issues,
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        AppError::ValidationError {
            code,
            message: message.into(),
            issues: Vec::new(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::AuthError {
            code: "UNAUTHORIZED",
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden {
            code: "FORBIDDEN",
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        AppError::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            AppError::AuthError { .. } => StatusCode::UNAUTHORIZED,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ExternalServiceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError { code, .. }
            | AppError::AuthError { code, .. }
            | AppError::Forbidden { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::RateLimited { code, .. } => *code,
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::ExternalServiceError(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::ExternalServiceError(msg) | AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            _ => {
                debug!(code = self.code(), error = %self, "Request rejected");
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound("Record not found".to_string()),
            StoreError::AlreadyRedeemed => {
                AppError::conflict("ALREADY_USED", "Ticket has already been used")
            }
            StoreError::Inventory(e) => e.into(),
            StoreError::UniqueViolation(constraint) => match constraint.as_str() {
                USERS_EMAIL_KEY => AppError::conflict("EMAIL_IN_USE", "Email is already in use"),
                USERS_ORG_CNPJ_KEY => {
                    AppError::conflict("TAX_ID_IN_USE", "Tax id is already registered")
                }
                TICKETS_QR_CODE_KEY => {
                    AppError::InternalServerError("Redemption code collision".to_string())
                }
                _ => AppError::conflict("CONFLICT", "Resource already exists"),
            },
            StoreError::Database(e) => AppError::DatabaseError(e),
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        let code = match err {
            InventoryError::InvalidTicketType => "INVALID_TICKET_TYPE",
            InventoryError::SalesClosed => "SALES_CLOSED",
            InventoryError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            InventoryError::AmountOverflow => "AMOUNT_OVERFLOW",
        };
        AppError::bad_request(code, err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let (public_message, details) = match &self {
            AppError::ValidationError {
                message, issues, ..
            } => {
                let details = if issues.is_empty() {
                    None
                } else {
                    serde_json::to_value(issues).ok()
                };
                (message.clone(), details)
            }
            AppError::AuthError { message, .. }
            | AppError::Forbidden { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::RateLimited { message, .. } => (message.clone(), None),
            AppError::NotFound(msg) | AppError::ExternalServiceError(msg) => (msg.clone(), None),
            AppError::InternalServerError(_) => ("An internal error occurred".to_string(), None),
            AppError::DatabaseError(_) => ("A database error occurred".to_string(), None),
        };

        error_response(code, public_message, details, status)
    }
}
