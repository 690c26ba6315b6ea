//! ObjectIO pluggable authentication strategies
//!
//! This crate provides:
//! - Extractors that pull credential material out of a request
//! - Engines that judge that material (AWS SigV2, POST policy, session
//!   tokens, anonymous)
//! - Strategies: ordered, first-match-wins chains of extractor/engine steps
//! - A registry holding one strategy per front-end, hot-swapped atomically
//!   when the configuration changes
//!
//! # Example
//!
//! ```rust,ignore
//! use objectio_authn::{Applier, AuthConfig, StrategyRegistry, UserStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(UserStore::new());
//! let config = AuthConfig::default();
//! let registry = Arc::new(StrategyRegistry::new(&config, store.backends())?);
//! let applier = Applier::from_config(registry.clone(), &config);
//!
//! // let identity = applier.apply(&mut request, None).await?;
//! // registry.reconfigure(&new_config)?;
//! ```

// Core types
pub mod credentials;
pub mod error;
pub mod identity;
pub mod request;

// Identity backends
pub mod backend;
pub mod store;
pub mod user;

// Extraction and judgement
pub mod engine;
pub mod engines;
pub mod extractor;
pub mod sigv2;

// Composition
pub mod applier;
pub mod config;
pub mod factory;
pub mod registry;
pub mod reload;
pub mod strategy;

pub use applier::Applier;
pub use backend::{Backends, CredentialBackend, StoredCredential, TokenBackend, TokenGrant};
pub use config::{AuthConfig, EngineKind, FrontendConfig, StepConfig};
pub use credentials::{CredentialMaterial, Scheme};
pub use engine::{Engine, EngineOutcome};
pub use error::{AuthError, BackendError, ConfigError, NO_APPLICABLE_CREDENTIALS, StoreError};
pub use extractor::Extractor;
pub use factory::{build_snapshot, build_strategy};
pub use identity::{AuthMethod, Identity};
pub use registry::{RegistrySnapshot, S3_MAIN, S3_POST, SWIFT, StrategyRegistry};
pub use reload::spawn_reconfigure_listener;
pub use request::AuthRequest;
pub use store::UserStore;
pub use strategy::{DenialPolicy, Evaluation, StepTrace, Strategy, StrategyBuilder};
pub use user::{AccessKey, KeyStatus, User, UserStatus};
