//! AWS Signature V2 browser-based POST upload engine
//!
//! The signature covers the base64 policy document itself. Policy
//! conditions (bucket, key prefix, content length) are enforced by the
//! upload handler once identity is known; only expiry is checked here.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

use super::{reason, resolve_access_key};
use crate::backend::CredentialBackend;
use crate::credentials::{CredentialMaterial, Scheme};
use crate::engine::{Engine, EngineOutcome};
use crate::identity::{AuthMethod, Identity};
use crate::request::AuthRequest;
use crate::sigv2;

#[derive(Deserialize)]
struct PolicyDocument {
    expiration: String,
}

/// Verifies signed POST policy uploads
pub struct PostPolicyV2Engine {
    credentials: Arc<dyn CredentialBackend>,
}

impl PostPolicyV2Engine {
    pub fn new(credentials: Arc<dyn CredentialBackend>) -> Self {
        Self { credentials }
    }

    fn policy_expiration(policy: &str) -> Option<DateTime<Utc>> {
        let decoded = BASE64.decode(policy.trim()).ok()?;
        let document: PolicyDocument = serde_json::from_slice(&decoded).ok()?;
        DateTime::parse_from_rfc3339(&document.expiration)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[async_trait]
impl Engine for PostPolicyV2Engine {
    fn name(&self) -> &str {
        "aws-v2-post-policy"
    }

    async fn authenticate(
        &self,
        material: Option<&CredentialMaterial>,
        _request: &AuthRequest<'_>,
    ) -> EngineOutcome {
        let Some(material) = material.filter(|m| m.scheme() == Scheme::AwsV2PostPolicy) else {
            return EngineOutcome::Indeterminate;
        };

        let (Some(signature), Some(policy)) = (material.signature(), material.scope()) else {
            return EngineOutcome::denied(reason::MALFORMED_CREDENTIALS);
        };
        if signature.is_empty() || policy.is_empty() {
            return EngineOutcome::denied(reason::MALFORMED_CREDENTIALS);
        }

        let credential = match resolve_access_key(
            self.credentials.as_ref(),
            self.name(),
            material.identifier(),
        )
        .await
        {
            Ok(credential) => credential,
            Err(outcome) => return outcome,
        };

        let calculated = sigv2::sign(&credential.access_key.secret_access_key, policy);
        if !sigv2::constant_time_eq(&calculated, signature) {
            tracing::debug!("POST policy signature mismatch for {}", material.identifier());
            return EngineOutcome::denied(reason::SIGNATURE_MISMATCH);
        }

        let Some(expiration) = Self::policy_expiration(policy) else {
            return EngineOutcome::denied(reason::MALFORMED_POLICY);
        };
        if expiration < Utc::now() {
            return EngineOutcome::denied(reason::POLICY_EXPIRED);
        }

        let user = credential.user;
        EngineOutcome::Granted(
            Identity::new(user.user_id, user.arn, AuthMethod::AwsV2PostPolicy)
                .with_engine(self.name())
                .with_display_name(user.display_name)
                .with_access_key(credential.access_key.access_key_id)
                .with_expiry(u64::try_from(expiration.timestamp()).unwrap_or_default()),
        )
    }
}
