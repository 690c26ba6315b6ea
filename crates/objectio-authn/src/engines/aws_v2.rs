//! AWS Signature V2 engine (header and presigned URL)

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use super::{reason, resolve_access_key};
use crate::backend::CredentialBackend;
use crate::credentials::{CredentialMaterial, Scheme};
use crate::engine::{Engine, EngineOutcome};
use crate::identity::{AuthMethod, Identity};
use crate::request::AuthRequest;
use crate::sigv2;

/// Verifies V2 signatures against access keys from a [`CredentialBackend`]
pub struct AwsV2Engine {
    credentials: Arc<dyn CredentialBackend>,
    /// Maximum distance between the request date and now
    max_clock_skew: Duration,
}

impl AwsV2Engine {
    pub fn new(credentials: Arc<dyn CredentialBackend>, max_clock_skew: Duration) -> Self {
        Self {
            credentials,
            max_clock_skew,
        }
    }

    /// Validate the request date and return the string-to-sign date field
    fn header_date_field<'m>(
        &self,
        material: &'m CredentialMaterial,
        request: &AuthRequest<'_>,
    ) -> Result<&'m str, EngineOutcome> {
        let raw = material
            .timestamp()
            .ok_or_else(|| EngineOutcome::denied(reason::MISSING_DATE))?;
        let date =
            sigv2::parse_http_date(raw).ok_or_else(|| EngineOutcome::denied(reason::INVALID_DATE))?;

        let skew = Utc::now()
            .signed_duration_since(date)
            .num_seconds()
            .unsigned_abs();
        if skew > self.max_clock_skew.as_secs() {
            return Err(EngineOutcome::denied(reason::REQUEST_TIME_SKEWED));
        }

        // A signed x-amz-date travels in the canonical headers instead.
        if request.headers.contains_key("x-amz-date") {
            Ok("")
        } else {
            Ok(raw)
        }
    }

    /// Validate `Expires` and return it as the string-to-sign date field
    fn query_date_field(material: &CredentialMaterial) -> Result<&str, EngineOutcome> {
        let raw = material
            .timestamp()
            .ok_or_else(|| EngineOutcome::denied(reason::MALFORMED_CREDENTIALS))?;
        let expires: i64 = raw
            .parse()
            .map_err(|_| EngineOutcome::denied(reason::MALFORMED_CREDENTIALS))?;

        if expires < Utc::now().timestamp() {
            return Err(EngineOutcome::denied(reason::REQUEST_EXPIRED));
        }
        Ok(raw)
    }
}

#[async_trait]
impl Engine for AwsV2Engine {
    fn name(&self) -> &str {
        "aws-v2"
    }

    async fn authenticate(
        &self,
        material: Option<&CredentialMaterial>,
        request: &AuthRequest<'_>,
    ) -> EngineOutcome {
        let Some(material) = material
            .filter(|m| matches!(m.scheme(), Scheme::AwsV2Header | Scheme::AwsV2Query))
        else {
            return EngineOutcome::Indeterminate;
        };

        let Some(signature) = material.signature().filter(|s| !s.is_empty()) else {
            return EngineOutcome::denied(reason::MALFORMED_CREDENTIALS);
        };

        let date_field = match material.scheme() {
            Scheme::AwsV2Header => self.header_date_field(material, request),
            _ => Self::query_date_field(material),
        };
        let date_field = match date_field {
            Ok(field) => field,
            Err(outcome) => return outcome,
        };

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

        let string_to_sign = sigv2::string_to_sign(request, date_field);
        let calculated = sigv2::sign(&credential.access_key.secret_access_key, &string_to_sign);

        if !sigv2::constant_time_eq(&calculated, signature) {
            tracing::debug!(
                "SigV2 signature mismatch for {}:\n  String to Sign:\n{}",
                material.identifier(),
                string_to_sign
            );
            return EngineOutcome::denied(reason::SIGNATURE_MISMATCH);
        }

        let user = credential.user;
        EngineOutcome::Granted(
            Identity::new(user.user_id, user.arn, AuthMethod::AwsV2)
                .with_engine(self.name())
                .with_display_name(user.display_name)
                .with_access_key(credential.access_key.access_key_id),
        )
    }
}
