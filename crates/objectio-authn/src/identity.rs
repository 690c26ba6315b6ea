//! Resolved principal handed back to the request boundary

use serde::Serialize;
use std::collections::HashMap;

/// Subject used for unauthenticated requests
pub const ANONYMOUS_SUBJECT: &str = "anonymous";
/// ARN used for unauthenticated requests
pub const ANONYMOUS_ARN: &str = "arn:obio:iam::objectio:anonymous";

/// How the identity was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    AwsV2,
    AwsV2PostPolicy,
    Token,
    Anonymous,
}

/// Authenticated identity produced by exactly one engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// User ID
    pub subject: String,
    /// ARN-style identifier for policy matching
    pub arn: String,
    pub method: AuthMethod,
    /// Engine that granted the request
    pub engine: String,
    pub display_name: Option<String>,
    /// Access key used, for signed requests
    pub access_key_id: Option<String>,
    /// Delegated/session attributes (groups, roles, token claims)
    pub attributes: HashMap<String, Vec<String>>,
    /// Session expiry as Unix seconds
    pub expires_at: Option<u64>,
}

impl Identity {
    pub fn new(subject: impl Into<String>, arn: impl Into<String>, method: AuthMethod) -> Self {
        Self {
            subject: subject.into(),
            arn: arn.into(),
            method,
            engine: String::new(),
            display_name: None,
            access_key_id: None,
            attributes: HashMap::new(),
            expires_at: None,
        }
    }

    /// Identity for a request that carried no credentials
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_SUBJECT, ANONYMOUS_ARN, AuthMethod::Anonymous)
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_access_key(mut self, access_key_id: impl Into<String>) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.attributes.insert(key.into(), values);
        self
    }

    pub fn with_expiry(mut self, expires_at: u64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.method == AuthMethod::Anonymous
    }

    /// Get groups from attributes
    pub fn groups(&self) -> Vec<&str> {
        self.attributes
            .get("groups")
            .map(|g| g.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
