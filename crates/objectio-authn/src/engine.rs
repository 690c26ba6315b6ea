//! Authentication engine trait and outcomes
//!
//! An engine judges one credential scheme. It receives whatever its paired
//! extractor found (possibly nothing) and classifies the request into exactly
//! one [`EngineOutcome`].

use async_trait::async_trait;

use crate::credentials::CredentialMaterial;
use crate::error::BackendError;
use crate::identity::Identity;
use crate::request::AuthRequest;

/// Result of a single engine evaluation
#[derive(Debug)]
pub enum EngineOutcome {
    /// Credentials verified; evaluation stops here
    Granted(Identity),
    /// Credentials for this scheme were present and rejected
    Denied(String),
    /// No material for this engine; try the next one
    Indeterminate,
    /// The backend could not be consulted
    Failure(BackendError),
}

impl EngineOutcome {
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied(reason.into())
    }

    /// Outcome label for logs and metrics
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Granted(_) => "granted",
            Self::Denied(_) => "denied",
            Self::Indeterminate => "indeterminate",
            Self::Failure(_) => "failure",
        }
    }
}

/// Trait for pluggable authentication engines
///
/// Implementations are shared across every in-flight request, so they must
/// not hold per-request mutable state. A future returned by `authenticate`
/// may be dropped at any await point when the client goes away.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Engine name for logging/metrics
    fn name(&self) -> &str;

    /// Judge the material extracted for this engine.
    ///
    /// Must return [`EngineOutcome::Indeterminate`] when `material` is `None`
    /// or belongs to a scheme this engine does not handle.
    async fn authenticate(
        &self,
        material: Option<&CredentialMaterial>,
        request: &AuthRequest<'_>,
    ) -> EngineOutcome;
}
