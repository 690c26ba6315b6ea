//! Authentication error types

use http::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Reason reported when every engine in a strategy declined the request.
pub const NO_APPLICABLE_CREDENTIALS: &str = "no applicable credentials";

/// Fault raised by an identity or credential backend.
///
/// This is never a judgement about the credentials themselves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend timed out after {0:?}")]
    Timeout(Duration),

    #[error("backend error: {0}")]
    Internal(String),
}

/// Terminal result of a failed authentication
#[derive(Debug, Error)]
pub enum AuthError {
    /// The request was judged and rejected. Never retried automatically.
    #[error("access denied: {reason}")]
    Denied {
        reason: String,
        /// Engine that issued the denial, `None` when the chain was exhausted
        engine: Option<String>,
    },

    /// A backend fault interrupted evaluation.
    #[error("authentication failure in {engine}: {source}")]
    Failure {
        engine: String,
        #[source]
        source: BackendError,
    },

    #[error("no strategy registered for front-end {0}")]
    UnknownFrontend(String),
}

impl AuthError {
    /// Denial produced by an exhausted chain
    pub fn no_applicable_credentials() -> Self {
        Self::Denied {
            reason: NO_APPLICABLE_CREDENTIALS.to_string(),
            engine: None,
        }
    }

    /// Stable, client-safe reason string
    pub fn reason(&self) -> &str {
        match self {
            Self::Denied { reason, .. } => reason,
            Self::Failure { .. } => "authentication service unavailable",
            Self::UnknownFrontend(_) => "authentication not configured",
        }
    }

    pub const fn is_denied(&self) -> bool {
        matches!(self, Self::Denied { .. })
    }

    /// HTTP status the request boundary should answer with
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Denied { .. } => StatusCode::FORBIDDEN,
            Self::Failure { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::UnknownFrontend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Rejected configuration. The previously published snapshot stays live.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no front-ends configured")]
    NoFrontends,

    #[error("front-end {0} has no authentication steps")]
    EmptyStrategy(String),

    #[error("front-end {0} uses the token engine but no token backend is available")]
    MissingTokenBackend(String),

    #[error("max_clock_skew_secs must be greater than zero")]
    InvalidClockSkew,

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// User and key administration errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("user already exists: {0}")]
    UserAlreadyExists(String),

    #[error("user is not active: {0}")]
    UserInactive(String),

    #[error("access key not found: {0}")]
    AccessKeyNotFound(String),

    #[error("access key already exists: {0}")]
    AccessKeyAlreadyExists(String),

    #[error("token not found")]
    TokenNotFound,
}
