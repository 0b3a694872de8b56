// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Built-in plugin implementations.
//!
//! These ship in-tree so the registry, discovery, and HTTP surface are
//! exercisable without any external service. Real connections (model
//! providers, social networks, chain RPCs) are out-of-process concerns
//! registered the same way.

use crate::domain::plugin::{
    ActionError, ActionParams, ActionPlugin, ConnectionPlugin, PluginCategory, PluginDescriptor,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

/// Action plugin that returns its `message` parameter. Useful as a
/// liveness probe for the action pipeline.
pub struct EchoAction {
    name: String,
    version: String,
}

impl EchoAction {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self { name: name.into(), version: version.into() }
    }
}

#[async_trait]
impl ActionPlugin for EchoAction {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            category: PluginCategory::Action,
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    fn validate_params(&self, params: &ActionParams) -> Vec<String> {
        match params.get("message") {
            Some(v) if v.is_string() => Vec::new(),
            Some(_) => vec!["'message' must be a string".to_string()],
            None => vec!["missing required field 'message'".to_string()],
        }
    }

    async fn execute(&self, params: ActionParams) -> Result<serde_json::Value, ActionError> {
        let message = params
            .get("message")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ActionError::Validation(vec!["missing required field 'message'".into()]))?;
        Ok(json!({ "echo": message }))
    }
}

/// Connection plugin backed by the local process. Supports `echo` and
/// `time` actions; `is_configured` flips once `initialize` has run.
pub struct LocalConnection {
    name: String,
    version: String,
    config: Mutex<Option<serde_json::Value>>,
}

impl LocalConnection {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            config: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ConnectionPlugin for LocalConnection {
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            category: PluginCategory::Connection,
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    async fn initialize(&self, config: &serde_json::Value) -> Result<(), ActionError> {
        if !config.is_object() {
            return Err(ActionError::Validation(vec![
                "connection configuration must be an object".to_string(),
            ]));
        }
        *self.config.lock() = Some(config.clone());
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), ActionError> {
        *self.config.lock() = None;
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.config.lock().is_some()
    }

    fn actions(&self) -> Vec<String> {
        vec!["echo".to_string(), "time".to_string()]
    }

    async fn perform_action(
        &self,
        action: &str,
        params: ActionParams,
    ) -> Result<serde_json::Value, ActionError> {
        if !self.is_configured() {
            return Err(ActionError::Fatal(format!(
                "connection '{}' is not configured",
                self.name
            )));
        }
        match action {
            "echo" => Ok(json!({
                "echo": params.get("message").cloned().unwrap_or(serde_json::Value::Null)
            })),
            "time" => Ok(json!({ "now": chrono::Utc::now().to_rfc3339() })),
            other => Err(ActionError::Fatal(format!(
                "connection '{}' does not support action '{}'",
                self.name, other
            ))),
        }
    }
}
