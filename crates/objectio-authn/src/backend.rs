//! Identity and credential backends consulted by engines
//!
//! Engines only hold `Arc` handles to these; the concrete store (metadata
//! service, Keystone, the in-memory [`UserStore`](crate::store::UserStore))
//! lives outside the strategy framework.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::BackendError;
use crate::user::{AccessKey, User};

/// Access key together with the user it belongs to
#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub access_key: AccessKey,
    pub user: User,
}

/// Session granted for a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub user_id: String,
    pub user_arn: String,
    pub display_name: Option<String>,
    /// Unix seconds after which the token is no longer honoured
    pub expires_at: u64,
    /// Delegated attributes (roles, groups, project)
    pub attributes: HashMap<String, Vec<String>>,
}

/// Lookup of access keys for signed-request schemes
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// `Ok(None)` when the key does not exist. `Err` is reserved for the
    /// backend itself failing.
    async fn lookup_access_key(
        &self,
        access_key_id: &str,
    ) -> Result<Option<StoredCredential>, BackendError>;
}

/// Validation of opaque session tokens
#[async_trait]
pub trait TokenBackend: Send + Sync {
    /// `Ok(None)` when the token is unknown
    async fn resolve_token(&self, token: &str) -> Result<Option<TokenGrant>, BackendError>;
}

/// Backend handles strategies are built against
#[derive(Clone)]
pub struct Backends {
    pub credentials: Arc<dyn CredentialBackend>,
    pub tokens: Option<Arc<dyn TokenBackend>>,
}

impl Backends {
    pub fn new(credentials: Arc<dyn CredentialBackend>) -> Self {
        Self {
            credentials,
            tokens: None,
        }
    }

    pub fn with_tokens(mut self, tokens: Arc<dyn TokenBackend>) -> Self {
        self.tokens = Some(tokens);
        self
    }
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends")
            .field("tokens", &self.tokens.is_some())
            .finish_non_exhaustive()
    }
}
