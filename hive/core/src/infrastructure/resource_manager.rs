// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Resource Manager - Tracked Pools of Shared Handles
//
// Every shared handle (API connection, session, client) is registered under
// a (category, name) key and held exclusively by at most one acquirer at a
// time. Acquisition is FIFO: waiters queue behind the current holder on a
// fair semaphore and are woken in arrival order. Teardown runs exactly once
// per entry, either explicitly or during shutdown().

use crate::domain::event::Event;
use crate::infrastructure::event_bus::EventBus;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info};

const SOURCE: &str = "resource_manager";

/// A handle managed by the [`ResourceManager`].
#[async_trait]
pub trait PooledResource: Send + Sync {
    /// Release the underlying handle. Invoked exactly once per entry.
    async fn teardown(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Free,
    Acquired,
    Destroyed,
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("resource already registered: {category}/{name}")]
    Duplicate { category: String, name: String },

    #[error("resource not found: {category}/{name}")]
    NotFound { category: String, name: String },

    #[error("timed out acquiring resource {category}/{name} after {timeout:?}")]
    Timeout {
        category: String,
        name: String,
        timeout: Duration,
    },

    #[error("resource destroyed: {category}/{name}")]
    Destroyed { category: String, name: String },
}

struct ResourceEntry {
    category: String,
    name: String,
    handle: Arc<dyn PooledResource>,
    // One permit: exclusive ownership. tokio's semaphore queues waiters
    // in FIFO order, which gives release-wakes-oldest-waiter.
    slot: Arc<Semaphore>,
    state: Mutex<ResourceState>,
}

/// Exclusive hold on a registered resource. Dropping the guard returns the
/// entry to the free state and wakes the first waiter.
pub struct ResourceGuard {
    entry: Arc<ResourceEntry>,
    _permit: OwnedSemaphorePermit,
}

impl ResourceGuard {
    pub fn resource(&self) -> &Arc<dyn PooledResource> {
        &self.entry.handle
    }
}

impl std::fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("name", &self.entry.name)
            .finish_non_exhaustive()
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        let mut state = self.entry.state.lock();
        if *state == ResourceState::Acquired {
            *state = ResourceState::Free;
        }
        // The permit drop (after this) readmits the next FIFO waiter.
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceStats {
    pub total: usize,
    pub free: usize,
    pub acquired: usize,
    pub destroyed: usize,
}

/// Tracked pools of shared handles, keyed by (category, name).
pub struct ResourceManager {
    entries: Mutex<HashMap<(String, String), Arc<ResourceEntry>>>,
    events: Arc<EventBus>,
}

impl ResourceManager {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self { entries: Mutex::new(HashMap::new()), events }
    }

    /// Track `resource` under `(category, name)`.
    pub fn register(
        &self,
        category: &str,
        name: &str,
        resource: Arc<dyn PooledResource>,
    ) -> Result<(), ResourceError> {
        let key = (category.to_string(), name.to_string());
        {
            let mut entries = self.entries.lock();
            if entries.contains_key(&key) {
                return Err(ResourceError::Duplicate {
                    category: category.to_string(),
                    name: name.to_string(),
                });
            }
            entries.insert(
                key,
                Arc::new(ResourceEntry {
                    category: category.to_string(),
                    name: name.to_string(),
                    handle: resource,
                    slot: Arc::new(Semaphore::new(1)),
                    state: Mutex::new(ResourceState::Free),
                }),
            );
        }

        debug!(category, name, "resource registered");
        self.events.publish(
            Event::new("resource.registered", SOURCE)
                .with_data("category", category)
                .with_data("name", name),
        );
        Ok(())
    }

    fn entry(&self, category: &str, name: &str) -> Result<Arc<ResourceEntry>, ResourceError> {
        self.entries
            .lock()
            .get(&(category.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ResourceError::NotFound {
                category: category.to_string(),
                name: name.to_string(),
            })
    }

    /// Non-blocking peek at a registered handle, regardless of holder.
    pub fn get(&self, category: &str, name: &str) -> Option<Arc<dyn PooledResource>> {
        let entries = self.entries.lock();
        let entry = entries.get(&(category.to_string(), name.to_string()))?;
        if *entry.state.lock() == ResourceState::Destroyed {
            return None;
        }
        Some(entry.handle.clone())
    }

    /// Acquire exclusive ownership of `(category, name)`, waiting behind the
    /// current holder for at most `timeout`.
    pub async fn acquire(
        &self,
        category: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<ResourceGuard, ResourceError> {
        let entry = self.entry(category, name)?;
        if *entry.state.lock() == ResourceState::Destroyed {
            return Err(ResourceError::Destroyed {
                category: category.to_string(),
                name: name.to_string(),
            });
        }

        let permit = match tokio::time::timeout(timeout, entry.slot.clone().acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            // Semaphore closed: the entry was destroyed while we waited.
            Ok(Err(_)) => {
                return Err(ResourceError::Destroyed {
                    category: category.to_string(),
                    name: name.to_string(),
                })
            }
            Err(_) => {
                return Err(ResourceError::Timeout {
                    category: category.to_string(),
                    name: name.to_string(),
                    timeout,
                })
            }
        };

        {
            let mut state = entry.state.lock();
            if *state == ResourceState::Destroyed {
                return Err(ResourceError::Destroyed {
                    category: category.to_string(),
                    name: name.to_string(),
                });
            }
            *state = ResourceState::Acquired;
        }

        Ok(ResourceGuard { entry, _permit: permit })
    }

    /// Tear down `(category, name)` exactly once. A second cleanup of the
    /// same entry is a no-op.
    pub async fn cleanup(&self, category: &str, name: &str) -> Result<(), ResourceError> {
        let entry = self.entry(category, name)?;
        self.cleanup_entry(&entry).await;
        Ok(())
    }

    /// Tear down every entry registered under `category`.
    pub async fn cleanup_category(&self, category: &str) {
        let entries: Vec<Arc<ResourceEntry>> = self
            .entries
            .lock()
            .values()
            .filter(|e| e.category == category)
            .cloned()
            .collect();
        for entry in entries {
            self.cleanup_entry(&entry).await;
        }
    }

    /// Tear down every non-destroyed entry. Called on process shutdown so
    /// no registered handle outlives the manager.
    pub async fn shutdown(&self) {
        info!("resource manager shutting down");
        let entries: Vec<Arc<ResourceEntry>> = self.entries.lock().values().cloned().collect();
        for entry in entries {
            self.cleanup_entry(&entry).await;
        }
    }

    async fn cleanup_entry(&self, entry: &Arc<ResourceEntry>) {
        // The state transition decides which caller runs teardown; every
        // later caller sees Destroyed and returns without side effects.
        {
            let mut state = entry.state.lock();
            if *state == ResourceState::Destroyed {
                return;
            }
            *state = ResourceState::Destroyed;
        }
        // Fail pending and future acquires.
        entry.slot.close();

        match entry.handle.teardown().await {
            Ok(()) => {
                debug!(category = %entry.category, name = %entry.name, "resource cleaned up");
                self.events.publish(
                    Event::new("resource.cleanup", SOURCE)
                        .with_data("category", entry.category.as_str())
                        .with_data("name", entry.name.as_str()),
                );
            }
            Err(e) => {
                error!(category = %entry.category, name = %entry.name, error = %e, "resource teardown failed");
                self.events.publish(
                    Event::new("resource.error", SOURCE)
                        .with_data("category", entry.category.as_str())
                        .with_data("name", entry.name.as_str())
                        .with_data("error", e.to_string()),
                );
            }
        }
    }

    pub fn state(&self, category: &str, name: &str) -> Option<ResourceState> {
        let entries = self.entries.lock();
        entries
            .get(&(category.to_string(), name.to_string()))
            .map(|entry| *entry.state.lock())
    }

    pub fn stats(&self) -> ResourceStats {
        let entries = self.entries.lock();
        let mut stats = ResourceStats { total: entries.len(), ..Default::default() };
        for entry in entries.values() {
            match *entry.state.lock() {
                ResourceState::Free => stats.free += 1,
                ResourceState::Acquired => stats.acquired += 1,
                ResourceState::Destroyed => stats.destroyed += 1,
            }
        }
        stats
    }
}
