//! Applies configuration updates published on a watch channel

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::AuthConfig;
use crate::registry::StrategyRegistry;

/// Reconfigure `registry` each time a new [`AuthConfig`] is sent.
///
/// Rejected configurations are logged by the registry and the previous
/// snapshot stays live. The task exits when every sender is dropped.
pub fn spawn_reconfigure_listener(
    registry: Arc<StrategyRegistry>,
    mut updates: watch::Receiver<AuthConfig>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let config = updates.borrow_and_update().clone();
            if let Ok(generation) = registry.reconfigure(&config) {
                tracing::debug!("Reconfigure listener applied generation {}", generation);
            }
        }
        tracing::info!("Authentication config channel closed, listener stopping");
    })
}

/// Poll until the registry reaches `generation` or `timeout` elapses
pub async fn wait_for_generation(
    registry: &StrategyRegistry,
    generation: u64,
    timeout: Duration,
) -> bool {
    let poll = async {
        while registry.generation() < generation {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    tokio::time::timeout(timeout, poll).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineKind, FrontendConfig};
    use crate::registry::{S3_MAIN, SWIFT};
    use crate::store::UserStore;

    const WAIT: Duration = Duration::from_secs(5);

    fn anonymous_swift() -> AuthConfig {
        let mut config = AuthConfig::default();
        config.frontends.insert(
            SWIFT.to_string(),
            FrontendConfig::new(&[EngineKind::Anonymous]),
        );
        config
    }

    #[tokio::test]
    async fn test_listener_applies_updates() {
        let store = Arc::new(UserStore::new());
        let registry =
            Arc::new(StrategyRegistry::new(&AuthConfig::default(), store.backends()).unwrap());
        let (tx, rx) = watch::channel(AuthConfig::default());
        let handle = spawn_reconfigure_listener(registry.clone(), rx);

        tx.send(anonymous_swift()).unwrap();
        assert!(wait_for_generation(&registry, 2, WAIT).await);
        assert_eq!(
            registry.get(SWIFT).unwrap().engine_names(),
            vec!["anonymous"]
        );

        // An invalid update is skipped, the next valid one still lands
        let mut invalid = AuthConfig::default();
        invalid
            .frontends
            .insert(S3_MAIN.to_string(), FrontendConfig::default());
        tx.send(invalid).unwrap();
        tx.send(AuthConfig::default()).unwrap();
        assert!(wait_for_generation(&registry, 3, WAIT).await);
        assert_eq!(registry.generation(), 3);
        assert_eq!(
            registry.get(SWIFT).unwrap().engine_names(),
            vec!["token", "anonymous"]
        );

        drop(tx);
        tokio::time::timeout(WAIT, handle).await.unwrap().unwrap();
    }
}
