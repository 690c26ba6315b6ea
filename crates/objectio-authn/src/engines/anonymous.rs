//! Anonymous fallback engine

use async_trait::async_trait;

use crate::credentials::{CredentialMaterial, Scheme};
use crate::engine::{Engine, EngineOutcome};
use crate::identity::Identity;
use crate::request::AuthRequest;

/// Grants the anonymous identity to requests that carry no credentials.
///
/// Whether anonymous callers may do anything is decided by bucket policy
/// later on.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousEngine;

#[async_trait]
impl Engine for AnonymousEngine {
    fn name(&self) -> &str {
        "anonymous"
    }

    async fn authenticate(
        &self,
        material: Option<&CredentialMaterial>,
        _request: &AuthRequest<'_>,
    ) -> EngineOutcome {
        match material {
            Some(m) if m.scheme() == Scheme::Anonymous => {
                EngineOutcome::Granted(Identity::anonymous().with_engine(self.name()))
            }
            _ => EngineOutcome::Indeterminate,
        }
    }
}
