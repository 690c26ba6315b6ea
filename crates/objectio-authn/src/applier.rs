//! Boundary between the HTTP layer and the strategy registry
//!
//! The applier picks the front-end a request belongs to, runs that
//! front-end's strategy and stores the resulting [`Identity`] in the
//! request extensions for handlers to read.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::identity::Identity;
use crate::registry::{S3_MAIN, S3_POST, SWIFT, StrategyRegistry};
use crate::request::AuthRequest;

/// Routes requests to front-end strategies
#[derive(Debug, Clone)]
pub struct Applier {
    registry: Arc<StrategyRegistry>,
    swift_prefix: String,
}

impl Applier {
    pub fn new(registry: Arc<StrategyRegistry>, swift_prefix: impl Into<String>) -> Self {
        Self {
            registry,
            swift_prefix: swift_prefix.into(),
        }
    }

    pub fn from_config(registry: Arc<StrategyRegistry>, config: &AuthConfig) -> Self {
        Self::new(registry, config.swift_prefix.clone())
    }

    pub fn registry(&self) -> &Arc<StrategyRegistry> {
        &self.registry
    }

    /// Front-end serving this request
    pub fn select_frontend(&self, request: &AuthRequest<'_>) -> &'static str {
        if self.is_swift_path(request.path) || request.has_token_header() {
            SWIFT
        } else if request.method.eq_ignore_ascii_case("POST") && request.form.is_some() {
            S3_POST
        } else {
            S3_MAIN
        }
    }

    fn is_swift_path(&self, path: &str) -> bool {
        path.strip_prefix(self.swift_prefix.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Authenticate through the selected front-end's strategy
    pub async fn authenticate(&self, request: &AuthRequest<'_>) -> Result<Identity, AuthError> {
        let frontend = self.select_frontend(request);
        let result = self.registry.authenticate(frontend, request).await;
        match &result {
            Ok(identity) => tracing::debug!(
                "Authenticated {} {} as {} via {}/{}",
                request.method,
                request.path,
                identity.subject,
                frontend,
                identity.engine
            ),
            Err(e) => tracing::debug!(
                "Rejected {} {} on {}: {}",
                request.method,
                request.path,
                frontend,
                e
            ),
        }
        result
    }

    /// Authenticate an HTTP request and attach the identity to its
    /// extensions. `form` holds the decoded fields of a POST upload.
    pub async fn apply<B>(
        &self,
        request: &mut http::Request<B>,
        form: Option<&BTreeMap<String, String>>,
    ) -> Result<Identity, AuthError> {
        let identity = {
            let mut auth_request = AuthRequest::new(
                request.method().as_str(),
                request.uri().path(),
                request.headers(),
            );
            if let Some(query) = request.uri().query() {
                auth_request = auth_request.with_query(query);
            }
            if let Some(form) = form {
                auth_request = auth_request.with_form(form);
            }
            if let Some(addr) = request.extensions().get::<SocketAddr>() {
                auth_request = auth_request.with_source_ip(addr.ip());
            }
            self.authenticate(&auth_request).await?
        };

        request.extensions_mut().insert(identity.clone());
        Ok(identity)
    }
}
