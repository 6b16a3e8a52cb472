use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Shown when a failure carries no usable server message.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Error payload the remote API returns on rejected requests.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    /// Field name -> messages, in the order the server sent them.
    #[serde(default)]
    pub errors: Option<Map<String, Value>>,
}

impl ErrorBody {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            errors: None,
        }
    }

    pub fn with_field_error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Map::new();
        errors.insert(field.into(), Value::Array(vec![Value::String(message.into())]));
        Self {
            message: None,
            errors: Some(errors),
        }
    }

    /// First message of the first field listed under `errors`.
    pub fn first_field_message(&self) -> Option<&str> {
        let (_, messages) = self.errors.as_ref()?.iter().next()?;
        let first = match messages {
            Value::Array(items) => items.first()?.as_str(),
            Value::String(message) => Some(message.as_str()),
            _ => None,
        };
        first.filter(|m| !m.is_empty())
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{path} returned HTTP {status}")]
    Status {
        path: String,
        status: u16,
        body: Option<ErrorBody>,
    },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn rejected(path: impl Into<String>, status: u16, body: Option<ErrorBody>) -> Self {
        ApiError::Status {
            path: path.into(),
            status,
            body,
        }
    }

    /// The single error-to-text mapping used across the application:
    /// first field-level validation message, else the general message, else
    /// [`FALLBACK_MESSAGE`].
    pub fn user_message(&self) -> String {
        if let ApiError::Status {
            body: Some(body), ..
        } = self
        {
            if let Some(message) = body.first_field_message() {
                return message.to_string();
            }
            if let Some(message) = body.message.as_deref().filter(|m| !m.is_empty()) {
                return message.to_string();
            }
        }
        FALLBACK_MESSAGE.to_string()
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            ApiError::Decode { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
