// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A notification published on the [`EventBus`](crate::infrastructure::event_bus::EventBus).
///
/// Events are immutable once published: the bus hands subscribers a shared
/// reference and never mutates the payload after `publish`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Dotted event name, e.g. `action.post-tweet.success` or `agent.alice.error`.
    pub name: String,

    /// Structured payload.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    /// Component that published the event.
    pub source: String,

    /// Identifier tracing a causal chain across publishes. Generated when
    /// the publisher does not supply one.
    pub correlation_id: String,
}

impl Event {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: HashMap::new(),
            source: source.into(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }
}
