//! Session token engine

use async_trait::async_trait;
use std::sync::Arc;

use super::reason;
use crate::backend::TokenBackend;
use crate::credentials::{CredentialMaterial, Scheme};
use crate::engine::{Engine, EngineOutcome};
use crate::identity::{AuthMethod, Identity};
use crate::request::AuthRequest;
use crate::user::unix_now;

/// Resolves opaque tokens through a [`TokenBackend`]
pub struct TokenEngine {
    tokens: Arc<dyn TokenBackend>,
}

impl TokenEngine {
    pub fn new(tokens: Arc<dyn TokenBackend>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl Engine for TokenEngine {
    fn name(&self) -> &str {
        "token"
    }

    async fn authenticate(
        &self,
        material: Option<&CredentialMaterial>,
        _request: &AuthRequest<'_>,
    ) -> EngineOutcome {
        let Some(material) = material.filter(|m| m.scheme() == Scheme::Token) else {
            return EngineOutcome::Indeterminate;
        };
        if material.identifier().is_empty() {
            return EngineOutcome::denied(reason::MALFORMED_CREDENTIALS);
        }

        let grant = match self.tokens.resolve_token(material.identifier()).await {
            Ok(Some(grant)) => grant,
            Ok(None) => return EngineOutcome::denied(reason::INVALID_TOKEN),
            Err(e) => {
                tracing::warn!("token: session lookup failed: {}", e);
                return EngineOutcome::Failure(e);
            }
        };

        if grant.expires_at <= unix_now() {
            return EngineOutcome::denied(reason::TOKEN_EXPIRED);
        }

        let mut identity = Identity::new(grant.user_id, grant.user_arn, AuthMethod::Token)
            .with_engine(self.name())
            .with_expiry(grant.expires_at);
        identity.display_name = grant.display_name;
        identity.attributes = grant.attributes;
        EngineOutcome::Granted(identity)
    }
}
