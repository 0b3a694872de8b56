// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Plugin capability contracts.
//!
//! Each plugin category is an explicit capability trait: conformance is
//! checked structurally when a candidate is registered, never probed at
//! call time. Connection plugins wrap an external service (social network,
//! chain RPC, model API); action plugins are self-contained operations
//! executed through the [`ActionHandler`](crate::infrastructure::action_handler::ActionHandler).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub type ActionParams = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCategory {
    Connection,
    Action,
}

impl std::fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginCategory::Connection => f.write_str("connection"),
            PluginCategory::Action => f.write_str("action"),
        }
    }
}

/// Identity of a registered plugin. `(category, name)` is unique within
/// the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub category: PluginCategory,
    pub name: String,
    pub version: String,
}

/// Failure raised by a plugin operation.
///
/// Plugins tag their own transience: `Transient` failures (network errors,
/// timeouts, rate limits) are eligible for automatic retry; `Fatal`
/// failures abort immediately.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("invalid parameters: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("{0}")]
    Fatal(String),
}

impl ActionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ActionError::Transient(_))
    }
}

/// Capability surface for `connection` plugins.
#[async_trait]
pub trait ConnectionPlugin: Send + Sync {
    fn descriptor(&self) -> PluginDescriptor;

    /// Apply runtime configuration (credentials, endpoints).
    async fn initialize(&self, config: &serde_json::Value) -> Result<(), ActionError>;

    /// Release any held connections or sessions.
    async fn cleanup(&self) -> Result<(), ActionError>;

    fn is_configured(&self) -> bool;

    /// Names of the actions this connection can perform.
    fn actions(&self) -> Vec<String>;

    async fn perform_action(
        &self,
        action: &str,
        params: ActionParams,
    ) -> Result<serde_json::Value, ActionError>;
}

/// Capability surface for `action` plugins.
#[async_trait]
pub trait ActionPlugin: Send + Sync {
    fn descriptor(&self) -> PluginDescriptor;

    /// Return a list of human-readable problems; empty means valid.
    fn validate_params(&self, params: &ActionParams) -> Vec<String>;

    async fn execute(&self, params: ActionParams) -> Result<serde_json::Value, ActionError>;
}
