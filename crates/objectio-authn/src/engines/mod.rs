//! Engine implementations
//!
//! - `aws_v2`: AWS Signature V2, header and presigned-URL forms
//! - `post_policy`: AWS Signature V2 browser POST uploads
//! - `token`: opaque session tokens (Swift `X-Auth-Token`, `Bearer`)
//! - `anonymous`: fallback for requests carrying no credentials

pub mod anonymous;
pub mod aws_v2;
pub mod post_policy;
pub mod token;

pub use anonymous::AnonymousEngine;
pub use aws_v2::AwsV2Engine;
pub use post_policy::PostPolicyV2Engine;
pub use token::TokenEngine;

use crate::backend::{CredentialBackend, StoredCredential};
use crate::engine::EngineOutcome;

/// Stable denial reasons reported to clients and audit logs
pub mod reason {
    pub const MALFORMED_CREDENTIALS: &str = "malformed credentials";
    pub const MISSING_DATE: &str = "missing date";
    pub const INVALID_DATE: &str = "invalid date";
    pub const REQUEST_TIME_SKEWED: &str = "request time too skewed";
    pub const REQUEST_EXPIRED: &str = "request has expired";
    pub const INVALID_ACCESS_KEY: &str = "invalid access key id";
    pub const ACCESS_KEY_INACTIVE: &str = "access key inactive";
    pub const USER_SUSPENDED: &str = "user suspended";
    pub const SIGNATURE_MISMATCH: &str = "signature mismatch";
    pub const MALFORMED_POLICY: &str = "malformed policy document";
    pub const POLICY_EXPIRED: &str = "policy expired";
    pub const INVALID_TOKEN: &str = "invalid token";
    pub const TOKEN_EXPIRED: &str = "token expired";
}

/// Look up an access key and check that it may be used.
///
/// Every failure is already classified: unknown or unusable keys are
/// denials, backend trouble is a failure.
async fn resolve_access_key(
    backend: &dyn CredentialBackend,
    engine: &str,
    access_key_id: &str,
) -> Result<StoredCredential, EngineOutcome> {
    if access_key_id.is_empty() {
        return Err(EngineOutcome::denied(reason::MALFORMED_CREDENTIALS));
    }

    let credential = match backend.lookup_access_key(access_key_id).await {
        Ok(Some(credential)) => credential,
        Ok(None) => return Err(EngineOutcome::denied(reason::INVALID_ACCESS_KEY)),
        Err(e) => {
            tracing::warn!("{}: credential lookup for {} failed: {}", engine, access_key_id, e);
            return Err(EngineOutcome::Failure(e));
        }
    };

    if !credential.access_key.is_active() {
        return Err(EngineOutcome::denied(reason::ACCESS_KEY_INACTIVE));
    }
    if !credential.user.is_active() {
        return Err(EngineOutcome::denied(reason::USER_SUSPENDED));
    }

    Ok(credential)
}
