//! Scheme-tagged credential material
//!
//! Produced by an [`Extractor`](crate::extractor::Extractor), consumed by the
//! paired [`Engine`](crate::engine::Engine), then dropped.

use std::fmt;

/// Credential scheme a piece of material belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// `Authorization: AWS <key>:<signature>`
    AwsV2Header,
    /// Presigned URL (`AWSAccessKeyId`, `Signature`, `Expires`)
    AwsV2Query,
    /// Browser-based POST upload with a signed policy document
    AwsV2PostPolicy,
    /// Opaque session token
    Token,
    /// No credentials at all
    Anonymous,
}

impl Scheme {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwsV2Header => "aws-v2-header",
            Self::AwsV2Query => "aws-v2-query",
            Self::AwsV2PostPolicy => "aws-v2-post-policy",
            Self::Token => "token",
            Self::Anonymous => "anonymous",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw credential fields pulled out of one request.
///
/// Fields are kept exactly as received. Validation is the engine's job, so
/// material may be present but malformed (e.g. no signature).
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialMaterial {
    scheme: Scheme,
    /// Access key id, or the token itself for [`Scheme::Token`]
    identifier: String,
    signature: Option<String>,
    /// Date header value or `Expires` epoch seconds, verbatim
    timestamp: Option<String>,
    /// Scheme-specific scope, e.g. the base64 POST policy document
    scope: Option<String>,
}

impl CredentialMaterial {
    pub fn new(scheme: Scheme, identifier: impl Into<String>) -> Self {
        Self {
            scheme,
            identifier: identifier.into(),
            signature: None,
            timestamp: None,
            scope: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(Scheme::Anonymous, "")
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }
}

// Signatures and tokens must never reach the logs.
impl fmt::Debug for CredentialMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let identifier = match self.scheme {
            Scheme::Token => "<redacted>",
            _ => self.identifier.as_str(),
        };
        f.debug_struct("CredentialMaterial")
            .field("scheme", &self.scheme)
            .field("identifier", &identifier)
            .field("signature", &self.signature.as_ref().map(|_| "<redacted>"))
            .field("timestamp", &self.timestamp)
            .field("scope", &self.scope.as_ref().map(|s| s.len()))
            .finish()
    }
}
