use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::ApiError;

/// Failures surfaced to the user by the services.
#[derive(Error, Debug)]
pub enum AppError {
    /// A local precondition failed; nothing was sent.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Request(#[from] ApiError),

    /// The same operation is already outstanding.
    #[error("{0}")]
    Busy(&'static str),

    #[error("session storage failed: {0:#}")]
    Storage(anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// Text shown in the notification area.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(message) => message.clone(),
            AppError::Request(e) => e.user_message(),
            AppError::Busy(message) => message.to_string(),
            AppError::Storage(e) => format!("Could not save your session: {}", e),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

/// Structured logging helpers
pub struct LogHelper;

impl LogHelper {
    pub fn log_mutation<Id: fmt::Display>(operation: &str, entity_id: Id, success: bool) {
        if success {
            info!(
                entity_id = %entity_id,
                operation = %operation,
                "Mutation completed successfully"
            );
        } else {
            error!(
                entity_id = %entity_id,
                operation = %operation,
                "Mutation failed"
            );
        }
    }

    pub fn log_request_failure(operation: &str, error: &ApiError) {
        warn!(
            operation = %operation,
            status = ?error.status(),
            error = %error,
            user_message = %error.user_message(),
            "Remote request failed"
        );
    }

    pub fn log_upload_progress(batch_id: &uuid::Uuid, current: usize, total: usize, percent: u8) {
        debug!(
            batch_id = %batch_id,
            file = current,
            total = total,
            percent = percent,
            "Upload progress"
        );
    }

    pub fn log_validation_failure(field: &str, reason: &str) {
        warn!(
            field = %field,
            reason = %reason,
            "Validation failed"
        );
    }
}
