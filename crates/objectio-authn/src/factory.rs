//! Builds strategies and registry snapshots from configuration
//!
//! Construction is all-or-nothing: any error aborts the whole snapshot so
//! a half-built registry is never published.

use std::sync::Arc;

use crate::backend::Backends;
use crate::config::{AuthConfig, EngineKind, FrontendConfig};
use crate::engine::Engine;
use crate::engines::{AnonymousEngine, AwsV2Engine, PostPolicyV2Engine, TokenEngine};
use crate::error::ConfigError;
use crate::extractor::{
    AnonymousExtractor, AwsV2HeaderExtractor, AwsV2QueryExtractor, Extractor,
    PostPolicyV2Extractor, TokenExtractor,
};
use crate::registry::RegistrySnapshot;
use crate::strategy::Strategy;

/// Engine instances shared by every strategy of one snapshot
struct EngineSet {
    aws_v2: Arc<dyn Engine>,
    post_policy: Arc<dyn Engine>,
    token: Option<Arc<dyn Engine>>,
    anonymous: Arc<dyn Engine>,
}

impl EngineSet {
    fn new(config: &AuthConfig, backends: &Backends) -> Self {
        Self {
            aws_v2: Arc::new(AwsV2Engine::new(
                backends.credentials.clone(),
                config.max_clock_skew(),
            )),
            post_policy: Arc::new(PostPolicyV2Engine::new(backends.credentials.clone())),
            token: backends
                .tokens
                .clone()
                .map(|tokens| Arc::new(TokenEngine::new(tokens)) as Arc<dyn Engine>),
            anonymous: Arc::new(AnonymousEngine),
        }
    }

    fn resolve(
        &self,
        frontend: &str,
        kind: EngineKind,
    ) -> Result<(Arc<dyn Extractor>, Arc<dyn Engine>), ConfigError> {
        let step = match kind {
            EngineKind::AwsV2Header => pair(AwsV2HeaderExtractor, &self.aws_v2),
            EngineKind::AwsV2Query => pair(AwsV2QueryExtractor, &self.aws_v2),
            EngineKind::AwsV2PostPolicy => pair(PostPolicyV2Extractor, &self.post_policy),
            EngineKind::Token => {
                let engine = self
                    .token
                    .as_ref()
                    .ok_or_else(|| ConfigError::MissingTokenBackend(frontend.to_string()))?;
                pair(TokenExtractor, engine)
            }
            EngineKind::Anonymous => pair(AnonymousExtractor, &self.anonymous),
        };
        Ok(step)
    }
}

fn pair<X: Extractor + 'static>(
    extractor: X,
    engine: &Arc<dyn Engine>,
) -> (Arc<dyn Extractor>, Arc<dyn Engine>) {
    let extractor: Arc<dyn Extractor> = Arc::new(extractor);
    (extractor, engine.clone())
}

fn build_with(
    engines: &EngineSet,
    frontend: &str,
    definition: &FrontendConfig,
) -> Result<Strategy, ConfigError> {
    let mut builder = Strategy::builder(frontend);
    for step in &definition.steps {
        let (extractor, engine) = engines.resolve(frontend, step.engine)?;
        builder = builder.step_arc(extractor, engine, step.on_denied);
    }
    builder.build()
}

/// Build the strategy for a single front-end
pub fn build_strategy(
    frontend: &str,
    config: &AuthConfig,
    backends: &Backends,
) -> Result<Strategy, ConfigError> {
    config.validate()?;
    let definition = config
        .frontends
        .get(frontend)
        .ok_or_else(|| ConfigError::Invalid(format!("unknown front-end: {frontend}")))?;
    build_with(&EngineSet::new(config, backends), frontend, definition)
}

/// Build a complete snapshot, one strategy per configured front-end
pub fn build_snapshot(
    config: &AuthConfig,
    backends: &Backends,
    generation: u64,
) -> Result<RegistrySnapshot, ConfigError> {
    config.validate()?;
    let engines = EngineSet::new(config, backends);

    let mut snapshot = RegistrySnapshot::new(generation);
    for (frontend, definition) in &config.frontends {
        snapshot = snapshot.with_strategy(frontend, build_with(&engines, frontend, definition)?);
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{S3_MAIN, S3_POST, SWIFT};
    use crate::store::UserStore;

    #[test]
    fn test_default_snapshot() {
        let store = Arc::new(UserStore::new());
        let snapshot = build_snapshot(&AuthConfig::default(), &store.backends(), 1).unwrap();

        assert_eq!(snapshot.generation(), 1);
        assert_eq!(snapshot.frontends(), vec![S3_MAIN, S3_POST, SWIFT]);
        assert_eq!(
            snapshot.get(S3_MAIN).unwrap().engine_names(),
            vec!["aws-v2", "aws-v2", "anonymous"]
        );
        assert_eq!(
            snapshot.get(SWIFT).unwrap().engine_names(),
            vec!["token", "anonymous"]
        );
    }

    #[test]
    fn test_token_step_needs_token_backend() {
        let store = Arc::new(UserStore::new());
        let backends = Backends::new(store);

        let result = build_snapshot(&AuthConfig::default(), &backends, 1);
        assert!(matches!(
            result,
            Err(ConfigError::MissingTokenBackend(name)) if name == SWIFT
        ));

        // Front-ends without token steps still build on their own
        let strategy = build_strategy(S3_POST, &AuthConfig::default(), &backends).unwrap();
        assert_eq!(strategy.name(), S3_POST);
    }
}
