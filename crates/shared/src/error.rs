use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    BadRequest,
    UsageLimit,
    Forbidden,
    NotFound,
    Banned,
    MempoolFull,
    RateLimited,
    Internal,
    Unknown,
}

impl ProviderErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            402 => Self::UsageLimit,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            418 => Self::Banned,
            425 => Self::MempoolFull,
            429 => Self::RateLimited,
            500..=599 => Self::Internal,
            _ => Self::Unknown,
        }
    }

    /// Whether repeating the same request later can reasonably succeed.
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::MempoolFull | Self::RateLimited | Self::Internal | Self::Unknown
        )
    }
}

/// Error body returned by the chain-data service on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Error)]
#[error("{code:?} ({status_code}): {message}")]
pub struct ProviderException {
    pub code: ProviderErrorCode,
    pub status_code: u16,
    pub message: String,
}

impl ProviderException {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            code: ProviderErrorCode::from_status(status_code),
            status_code,
            message: message.into(),
        }
    }
}

impl From<ProviderErrorBody> for ProviderException {
    fn from(value: ProviderErrorBody) -> Self {
        let message = if value.message.is_empty() {
            value.error
        } else {
            format!("{}: {}", value.error, value.message)
        };
        Self::new(value.status_code, message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanShapeError {
    #[error("a stake plan needs at least one action")]
    Empty,
    #[error("a stake plan may carry each action at most once")]
    DuplicateAction,
    #[error("deregistration cannot be combined with delegation")]
    DeregisterWithDelegate,
    #[error("registration cannot be combined with deregistration")]
    RegisterWithDeregister,
    #[error("registration must precede delegation")]
    DelegateBeforeRegister,
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
