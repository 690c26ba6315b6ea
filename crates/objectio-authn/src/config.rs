//! Authentication configuration
//!
//! Loaded from TOML with `OBJECTIO_AUTH__*` environment overrides, e.g.
//!
//! ```toml
//! max_clock_skew_secs = 900
//!
//! [frontends.s3-main]
//! steps = [
//!     { engine = "aws-v2-header" },
//!     { engine = "aws-v2-query" },
//!     { engine = "anonymous" },
//! ]
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::registry::{S3_MAIN, S3_POST, SWIFT};
use crate::strategy::DenialPolicy;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "OBJECTIO_AUTH";

/// Engine a step runs, paired with its extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    AwsV2Header,
    AwsV2Query,
    AwsV2PostPolicy,
    Token,
    Anonymous,
}

/// One step of a front-end's strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepConfig {
    pub engine: EngineKind,
    #[serde(default)]
    pub on_denied: DenialPolicy,
}

impl StepConfig {
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            on_denied: DenialPolicy::default(),
        }
    }
}

/// Strategy definition for one front-end
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendConfig {
    pub steps: Vec<StepConfig>,
}

impl FrontendConfig {
    pub fn new(engines: &[EngineKind]) -> Self {
        Self {
            steps: engines.iter().copied().map(StepConfig::new).collect(),
        }
    }
}

/// Root authentication configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Accepted distance between a signed request's date and now
    pub max_clock_skew_secs: u64,
    /// Path prefix routed to the Swift front-end
    pub swift_prefix: String,
    /// Strategy per front-end id
    pub frontends: BTreeMap<String, FrontendConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut frontends = BTreeMap::new();
        frontends.insert(
            S3_MAIN.to_string(),
            FrontendConfig::new(&[
                EngineKind::AwsV2Header,
                EngineKind::AwsV2Query,
                EngineKind::Anonymous,
            ]),
        );
        frontends.insert(
            S3_POST.to_string(),
            FrontendConfig::new(&[EngineKind::AwsV2PostPolicy, EngineKind::Anonymous]),
        );
        frontends.insert(
            SWIFT.to_string(),
            FrontendConfig::new(&[EngineKind::Token, EngineKind::Anonymous]),
        );

        Self {
            max_clock_skew_secs: 900, // 15 minutes
            swift_prefix: "/swift".to_string(),
            frontends,
        }
    }
}

impl AuthConfig {
    /// Load from a TOML file plus environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_settings(path)
    }

    /// Parse from a TOML string (no environment overrides)
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn max_clock_skew(&self) -> Duration {
        Duration::from_secs(self.max_clock_skew_secs)
    }

    /// Structural checks that do not depend on backends
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frontends.is_empty() {
            return Err(ConfigError::NoFrontends);
        }
        if self.max_clock_skew_secs == 0 {
            return Err(ConfigError::InvalidClockSkew);
        }
        if !self.swift_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "swift_prefix must start with '/': {}",
                self.swift_prefix
            )));
        }
        for (frontend, definition) in &self.frontends {
            if frontend.is_empty() {
                return Err(ConfigError::Invalid("empty front-end id".to_string()));
            }
            if definition.steps.is_empty() {
                return Err(ConfigError::EmptyStrategy(frontend.clone()));
            }
        }
        Ok(())
    }
}

/// Deserialize any settings type from a TOML file plus environment overrides
pub fn load_settings<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let name = path
        .to_str()
        .ok_or_else(|| ConfigError::Invalid(format!("non UTF-8 path: {}", path.display())))?;

    let settings = config::Config::builder()
        .add_source(config::File::new(name, config::FileFormat::Toml))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;
    Ok(settings.try_deserialize()?)
}
