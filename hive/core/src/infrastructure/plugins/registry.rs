// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::plugin::{
    ActionPlugin, ConnectionPlugin, PluginCategory, PluginDescriptor,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin already registered: {category}/{name}")]
    Duplicate { category: PluginCategory, name: String },

    #[error("plugin not found: {category}/{name}")]
    NotFound { category: PluginCategory, name: String },
}

/// A registered capability implementation.
#[derive(Clone)]
pub enum PluginHandle {
    Connection(Arc<dyn ConnectionPlugin>),
    Action(Arc<dyn ActionPlugin>),
}

impl PluginHandle {
    pub fn category(&self) -> PluginCategory {
        match self {
            PluginHandle::Connection(_) => PluginCategory::Connection,
            PluginHandle::Action(_) => PluginCategory::Action,
        }
    }

    pub fn descriptor(&self) -> PluginDescriptor {
        match self {
            PluginHandle::Connection(p) => p.descriptor(),
            PluginHandle::Action(p) => p.descriptor(),
        }
    }
}

/// Registry of capability implementations, keyed by (category, name).
///
/// The table is guarded by its own lock; lookups clone the `Arc` out so the
/// lock is never held across a plugin call.
pub struct PluginRegistry {
    table: RwLock<HashMap<(PluginCategory, String), PluginHandle>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self { table: RwLock::new(HashMap::new()) }
    }

    /// Register `handle` under its descriptor's (category, name).
    ///
    /// Fails with [`PluginError::Duplicate`] when the key is taken, unless
    /// `override_existing` is set, in which case the newcomer replaces the
    /// previous registration.
    pub fn register(&self, handle: PluginHandle, override_existing: bool) -> Result<(), PluginError> {
        let descriptor = handle.descriptor();
        let key = (handle.category(), descriptor.name.clone());

        let mut table = self.table.write();
        if table.contains_key(&key) && !override_existing {
            return Err(PluginError::Duplicate { category: key.0, name: key.1 });
        }
        debug!(category = %key.0, name = %key.1, version = %descriptor.version, "plugin registered");
        table.insert(key, handle);
        Ok(())
    }

    pub fn get_connection(&self, name: &str) -> Result<Arc<dyn ConnectionPlugin>, PluginError> {
        match self.table.read().get(&(PluginCategory::Connection, name.to_string())) {
            Some(PluginHandle::Connection(p)) => Ok(p.clone()),
            _ => Err(PluginError::NotFound {
                category: PluginCategory::Connection,
                name: name.to_string(),
            }),
        }
    }

    pub fn get_action(&self, name: &str) -> Result<Arc<dyn ActionPlugin>, PluginError> {
        match self.table.read().get(&(PluginCategory::Action, name.to_string())) {
            Some(PluginHandle::Action(p)) => Ok(p.clone()),
            _ => Err(PluginError::NotFound {
                category: PluginCategory::Action,
                name: name.to_string(),
            }),
        }
    }

    /// Descriptors of every registered plugin, optionally filtered by
    /// category, sorted by (category, name) for stable listings.
    pub fn list(&self, category: Option<PluginCategory>) -> Vec<PluginDescriptor> {
        let table = self.table.read();
        let mut descriptors: Vec<PluginDescriptor> = table
            .values()
            .filter(|h| category.is_none_or(|c| h.category() == c))
            .map(PluginHandle::descriptor)
            .collect();
        descriptors.sort_by(|a, b| (a.category, &a.name).cmp(&(b.category, &b.name)));
        descriptors
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::plugins::builtin::{EchoAction, LocalConnection};

    fn echo(version: &str) -> PluginHandle {
        PluginHandle::Action(Arc::new(EchoAction::new("echo", version)))
    }

    #[test]
    fn duplicate_without_override_fails() {
        let registry = PluginRegistry::new();
        registry.register(echo("1.0.0"), false).unwrap();

        let err = registry.register(echo("2.0.0"), false).unwrap_err();
        assert!(matches!(err, PluginError::Duplicate { .. }));
        assert_eq!(registry.get_action("echo").unwrap().descriptor().version, "1.0.0");
    }

    #[test]
    fn override_replaces_previous_registration() {
        let registry = PluginRegistry::new();
        registry.register(echo("1.0.0"), false).unwrap();
        registry.register(echo("2.0.0"), true).unwrap();
        assert_eq!(registry.get_action("echo").unwrap().descriptor().version, "2.0.0");
    }

    #[test]
    fn lookup_miss_is_not_found() {
        let registry = PluginRegistry::new();
        assert!(matches!(
            registry.get_action("missing"),
            Err(PluginError::NotFound { .. })
        ));
    }

    #[test]
    fn categories_do_not_collide() {
        let registry = PluginRegistry::new();
        registry.register(echo("1.0.0"), false).unwrap();
        registry
            .register(
                PluginHandle::Connection(Arc::new(LocalConnection::new("echo", "1.0.0"))),
                false,
            )
            .unwrap();

        assert!(registry.get_action("echo").is_ok());
        assert!(registry.get_connection("echo").is_ok());
        assert_eq!(registry.list(None).len(), 2);
        assert_eq!(registry.list(Some(PluginCategory::Action)).len(), 1);
    }
}
