use thiserror::Error;

use crate::domain::entities::action::PendingAction;

/// Classified failure surfaced by every service in the crate. Raw transport
/// or storage errors never cross a service boundary unclassified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(String),

    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("local record missing: {0}")]
    LocalData(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl FeedError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        FeedError::Api {
            status,
            message: message.into(),
        }
    }

    /// Network failures are always worth a resubmit; API failures only if the
    /// caller chooses to. Unknown and local-data failures are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Network(_) | FeedError::Api { .. })
    }
}

impl From<sqlx::Error> for FeedError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => FeedError::LocalData(err.to_string()),
            _ => FeedError::Unknown(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for FeedError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        FeedError::Unknown(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Unknown(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

/// A mutating-action failure, tagged with enough context to retry the same
/// action verbatim.
#[derive(Debug, Clone, Error)]
#[error("{} action failed: {source}", action.kind)]
pub struct ActionError {
    pub action: PendingAction,
    #[source]
    pub source: FeedError,
}

impl ActionError {
    pub fn new(action: PendingAction, source: FeedError) -> Self {
        Self { action, source }
    }

    pub fn is_retryable(&self) -> bool {
        self.source.is_retryable()
    }

    /// How the failed action left local state, so the caller can word the
    /// retry affordance accordingly.
    pub fn failure_policy(&self) -> crate::domain::entities::action::FailurePolicy {
        self.action.kind.failure_policy()
    }
}
