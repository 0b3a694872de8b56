// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Action Handler - Validated, Retrying Action Execution
//
// Resolves a named action through the plugin registry, validates its
// parameters, and executes it under an explicit retry policy: exponential
// backoff, transient errors only. Lifecycle events are published around
// every execution.

use crate::domain::config::RetryConfig;
use crate::domain::event::Event;
use crate::domain::plugin::{ActionError, ActionParams};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::plugins::registry::PluginRegistry;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const SOURCE: &str = "action_handler";

/// Explicit retry policy value object.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts, including the first.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each further attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Backoff before retrying after attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2_u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3, base_delay: Duration::from_millis(500) }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self { max_retries: config.max_retries, base_delay: config.base_delay }
    }
}

/// Final failure after the retry budget is exhausted (or a fatal error cut
/// it short). Carries how many attempts ran.
#[derive(Debug, Error)]
#[error("action '{action}' failed after {attempts} attempt(s): {source}")]
pub struct ActionExecutionError {
    pub action: String,
    pub attempts: u32,
    #[source]
    pub source: ActionError,
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("action plugin not found: {0}")]
    NotFound(String),

    #[error("invalid parameters for '{action}': {}", .errors.join(", "))]
    Validation { action: String, errors: Vec<String> },

    #[error(transparent)]
    Execution(#[from] ActionExecutionError),
}

pub struct ActionHandler {
    registry: Arc<PluginRegistry>,
    events: Arc<EventBus>,
    policy: RetryPolicy,
}

impl ActionHandler {
    pub fn new(registry: Arc<PluginRegistry>, events: Arc<EventBus>, policy: RetryPolicy) -> Self {
        Self { registry, events, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Execute action `name` with `params` under the configured policy.
    pub async fn execute(
        &self,
        name: &str,
        params: ActionParams,
    ) -> Result<serde_json::Value, ExecuteError> {
        let action = self
            .registry
            .get_action(name)
            .map_err(|_| ExecuteError::NotFound(name.to_string()))?;

        // Fail fast on bad parameters; validation failures never retry.
        let errors = action.validate_params(&params);
        if !errors.is_empty() {
            return Err(ExecuteError::Validation { action: name.to_string(), errors });
        }

        self.events.publish(
            Event::new(format!("action.{name}.start"), SOURCE)
                .with_data("params", serde_json::to_value(&params).unwrap_or_default()),
        );

        let mut attempts = 0;
        let mut last_error: Option<ActionError> = None;

        while attempts < self.policy.max_retries {
            attempts += 1;
            match action.execute(params.clone()).await {
                Ok(result) => {
                    debug!(action = name, attempts, "action succeeded");
                    metrics::counter!("hive_actions_succeeded_total").increment(1);
                    self.events.publish(
                        Event::new(format!("action.{name}.success"), SOURCE)
                            .with_data("result", result.clone())
                            .with_data("retries", attempts - 1),
                    );
                    return Ok(result);
                }
                Err(e) if e.is_transient() && attempts < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempts);
                    warn!(
                        action = name,
                        attempt = attempts,
                        max = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient action failure, retrying"
                    );
                    last_error = Some(e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    last_error = Some(e);
                    break;
                }
            }
        }

        let source = last_error.unwrap_or_else(|| ActionError::Fatal("unknown failure".into()));
        metrics::counter!("hive_actions_failed_total").increment(1);
        self.events.publish(
            Event::new(format!("action.{name}.failure"), SOURCE)
                .with_data("error", source.to_string())
                .with_data("attempts", attempts),
        );
        Err(ActionExecutionError { action: name.to_string(), attempts, source }.into())
    }
}
