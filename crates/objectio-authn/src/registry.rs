//! Strategy registry with atomic hot-swap
//!
//! Readers load the current [`RegistrySnapshot`] without locking and keep
//! using it for the whole request. Writers build a complete replacement and
//! publish it with a single pointer swap, so no request ever observes a
//! half-applied configuration.

use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::Backends;
use crate::config::AuthConfig;
use crate::error::{AuthError, ConfigError};
use crate::factory::build_snapshot;
use crate::identity::Identity;
use crate::request::AuthRequest;
use crate::strategy::Strategy;

/// Main S3 REST front-end
pub const S3_MAIN: &str = "s3-main";
/// Browser-based S3 POST upload front-end
pub const S3_POST: &str = "s3-post";
/// OpenStack Swift front-end
pub const SWIFT: &str = "swift";

/// Immutable set of strategies, one per front-end
#[derive(Clone, Default)]
pub struct RegistrySnapshot {
    generation: u64,
    strategies: BTreeMap<String, Arc<Strategy>>,
}

impl RegistrySnapshot {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            strategies: BTreeMap::new(),
        }
    }

    /// Add or replace the strategy serving `frontend`
    pub fn with_strategy(mut self, frontend: &str, strategy: Strategy) -> Self {
        self.strategies.insert(frontend.to_string(), Arc::new(strategy));
        self
    }

    fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Monotonic publish counter, 0 for a snapshot that was never published
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, frontend: &str) -> Option<&Arc<Strategy>> {
        self.strategies.get(frontend)
    }

    /// Front-end ids in sorted order
    pub fn frontends(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl fmt::Debug for RegistrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrySnapshot")
            .field("generation", &self.generation)
            .field("strategies", &self.strategies.values().collect::<Vec<_>>())
            .finish()
    }
}

/// Process-wide authentication strategies, shared as `Arc<StrategyRegistry>`
pub struct StrategyRegistry {
    current: ArcSwap<RegistrySnapshot>,
    /// Backends new snapshots are built against
    backends: RwLock<Backends>,
}

impl StrategyRegistry {
    /// Build the registry from configuration. The first snapshot is
    /// generation 1.
    pub fn new(config: &AuthConfig, backends: Backends) -> Result<Self, ConfigError> {
        let snapshot = build_snapshot(config, &backends, 1)?;
        tracing::info!(
            "Authentication registry created with front-ends {:?}",
            snapshot.frontends()
        );
        Ok(Self {
            current: ArcSwap::from_pointee(snapshot),
            backends: RwLock::new(backends),
        })
    }

    /// Wrap an already built snapshot
    pub fn from_snapshot(snapshot: RegistrySnapshot, backends: Backends) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
            backends: RwLock::new(backends),
        }
    }

    /// The snapshot live right now
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    /// Strategy currently serving `frontend`
    pub fn get(&self, frontend: &str) -> Option<Arc<Strategy>> {
        self.current.load().get(frontend).cloned()
    }

    /// Authenticate against the strategy of `frontend`.
    ///
    /// The snapshot is loaded once; a reconfiguration published while this
    /// call is in flight does not affect it.
    pub async fn authenticate(
        &self,
        frontend: &str,
        request: &AuthRequest<'_>,
    ) -> Result<Identity, AuthError> {
        let strategy = self
            .get(frontend)
            .ok_or_else(|| AuthError::UnknownFrontend(frontend.to_string()))?;
        strategy.authenticate(request).await
    }

    /// Rebuild every strategy from `config` and publish the result.
    ///
    /// On error the previous snapshot stays live. Returns the new generation.
    pub fn reconfigure(&self, config: &AuthConfig) -> Result<u64, ConfigError> {
        let backends = self.backends.read().clone();
        self.publish(config, &backends)
    }

    /// Like [`reconfigure`](Self::reconfigure), also switching backends.
    /// The backends are only kept if the new snapshot is published.
    pub fn reconfigure_with(
        &self,
        config: &AuthConfig,
        backends: Backends,
    ) -> Result<u64, ConfigError> {
        let mut current = self.backends.write();
        let generation = self.publish(config, &backends)?;
        *current = backends;
        Ok(generation)
    }

    fn publish(&self, config: &AuthConfig, backends: &Backends) -> Result<u64, ConfigError> {
        let built = match build_snapshot(config, backends, 0) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(
                    "Rejected authentication reconfiguration, keeping generation {}: {}",
                    self.generation(),
                    e
                );
                count_reconfiguration("rejected");
                return Err(e);
            }
        };

        let previous = self
            .current
            .rcu(|current| built.clone().with_generation(current.generation() + 1));
        let generation = previous.generation() + 1;

        tracing::info!(
            "Published authentication generation {} with front-ends {:?}",
            generation,
            built.frontends()
        );
        count_reconfiguration("published");
        Ok(generation)
    }

    /// Publish a copy of the current snapshot with one front-end's strategy
    /// replaced (or added). Other front-ends keep their strategy instances.
    pub fn replace_strategy(&self, frontend: &str, strategy: Strategy) -> u64 {
        let strategy = Arc::new(strategy);
        let previous = self.current.rcu(|current| {
            let mut next =
                RegistrySnapshot::clone(current).with_generation(current.generation() + 1);
            next.strategies.insert(frontend.to_string(), strategy.clone());
            next
        });
        let generation = previous.generation() + 1;

        tracing::info!("Replaced strategy for {} (generation {})", frontend, generation);
        count_reconfiguration("published");
        generation
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("current", &self.snapshot())
            .finish_non_exhaustive()
    }
}

fn count_reconfiguration(result: &'static str) {
    metrics::counter!("objectio_auth_reconfigurations_total", "result" => result).increment(1);
}
