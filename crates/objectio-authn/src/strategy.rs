//! Authentication strategies
//!
//! A strategy is an ordered chain of (extractor, engine) steps evaluated
//! first-match-wins:
//!
//! - `Granted` stops the chain and succeeds.
//! - `Indeterminate` moves on to the next step.
//! - `Denied` stops the chain with that reason, unless the step was built
//!   with [`DenialPolicy::FallThrough`].
//! - `Failure` stops the chain with the backend error.
//!
//! Running out of steps yields `Denied("no applicable credentials")`.
//! Step order is fixed at construction and is the precedence order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::engine::{Engine, EngineOutcome};
use crate::error::{AuthError, ConfigError};
use crate::extractor::Extractor;
use crate::identity::Identity;
use crate::request::AuthRequest;

/// What a `Denied` outcome does to the rest of the chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DenialPolicy {
    /// Stop and reject the request
    #[default]
    ShortCircuit,
    /// Remember the denial and keep evaluating. If nothing later grants,
    /// the remembered denial is returned.
    FallThrough,
}

/// One link of the chain
struct Step {
    extractor: Arc<dyn Extractor>,
    engine: Arc<dyn Engine>,
    on_denied: DenialPolicy,
}

/// Record of one evaluated step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTrace {
    pub position: usize,
    pub engine: String,
    pub outcome: &'static str,
}

/// Full result of one strategy evaluation
#[derive(Debug)]
pub struct Evaluation {
    pub result: Result<Identity, AuthError>,
    /// Steps that actually ran, in order
    pub trail: Vec<StepTrace>,
}

/// Ordered, immutable chain of authentication steps
pub struct Strategy {
    name: String,
    steps: Vec<Step>,
}

impl Strategy {
    pub fn builder(name: impl Into<String>) -> StrategyBuilder {
        StrategyBuilder {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Engine names in precedence order
    pub fn engine_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.engine.name()).collect()
    }

    /// Authenticate a request, returning the identity or the terminal error
    pub async fn authenticate(&self, request: &AuthRequest<'_>) -> Result<Identity, AuthError> {
        self.evaluate(request).await.result
    }

    /// Run the chain and keep the audit trail
    pub async fn evaluate(&self, request: &AuthRequest<'_>) -> Evaluation {
        let mut trail = Vec::with_capacity(self.steps.len());
        let mut deferred: Option<AuthError> = None;

        for (position, step) in self.steps.iter().enumerate() {
            let engine = step.engine.name();
            let material = step.extractor.extract(request);
            let outcome = step.engine.authenticate(material.as_ref(), request).await;

            tracing::debug!(
                "Strategy {} step {} ({}/{}): {}",
                self.name,
                position,
                step.extractor.name(),
                engine,
                outcome.kind()
            );
            trail.push(StepTrace {
                position,
                engine: engine.to_string(),
                outcome: outcome.kind(),
            });

            let result = match outcome {
                EngineOutcome::Granted(identity) => Ok(identity),
                EngineOutcome::Indeterminate => continue,
                EngineOutcome::Denied(reason) => {
                    let denial = AuthError::Denied {
                        reason,
                        engine: Some(engine.to_string()),
                    };
                    if step.on_denied == DenialPolicy::FallThrough {
                        deferred = Some(denial);
                        continue;
                    }
                    Err(denial)
                }
                EngineOutcome::Failure(source) => {
                    tracing::warn!("Strategy {} aborted by {}: {}", self.name, engine, source);
                    Err(AuthError::Failure {
                        engine: engine.to_string(),
                        source,
                    })
                }
            };
            return self.finish(result, trail);
        }

        let result = Err(deferred.unwrap_or_else(AuthError::no_applicable_credentials));
        self.finish(result, trail)
    }

    fn finish(&self, result: Result<Identity, AuthError>, trail: Vec<StepTrace>) -> Evaluation {
        let outcome = match &result {
            Ok(_) => "granted",
            Err(AuthError::Failure { .. }) => "failure",
            Err(_) => "denied",
        };
        metrics::counter!(
            "objectio_auth_decisions_total",
            "strategy" => self.name.clone(),
            "outcome" => outcome
        )
        .increment(1);

        Evaluation { result, trail }
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategy")
            .field("name", &self.name)
            .field("engines", &self.engine_names())
            .finish()
    }
}

/// Builder collecting steps in precedence order
pub struct StrategyBuilder {
    name: String,
    steps: Vec<Step>,
}

impl StrategyBuilder {
    /// Append a step that short-circuits on denial
    pub fn step<X: Extractor + 'static>(self, extractor: X, engine: Arc<dyn Engine>) -> Self {
        self.step_with_policy(extractor, engine, DenialPolicy::ShortCircuit)
    }

    /// Append a step with an explicit denial policy
    pub fn step_with_policy<X: Extractor + 'static>(
        self,
        extractor: X,
        engine: Arc<dyn Engine>,
        on_denied: DenialPolicy,
    ) -> Self {
        self.step_arc(Arc::new(extractor), engine, on_denied)
    }

    pub fn step_arc(
        mut self,
        extractor: Arc<dyn Extractor>,
        engine: Arc<dyn Engine>,
        on_denied: DenialPolicy,
    ) -> Self {
        self.steps.push(Step {
            extractor,
            engine,
            on_denied,
        });
        self
    }

    pub fn build(self) -> Result<Strategy, ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::EmptyStrategy(self.name));
        }
        Ok(Strategy {
            name: self.name,
            steps: self.steps,
        })
    }
}
