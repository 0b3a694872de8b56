// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service wiring: one shared instance of each core service, handed to both
// the HTTP control surface and the swarm manager.

use anyhow::Result;
use hive_core::application::brain::{Brain, NullBrain};
use hive_core::application::pipeline::TaskPipeline;
use hive_core::domain::config::HiveConfig;
use hive_core::infrastructure::action_handler::{ActionHandler, RetryPolicy};
use hive_core::infrastructure::event_bus::EventBus;
use hive_core::infrastructure::plugins::builtin::{EchoAction, LocalConnection};
use hive_core::infrastructure::plugins::discovery::PluginDiscovery;
use hive_core::infrastructure::plugins::registry::{PluginHandle, PluginRegistry};
use hive_core::infrastructure::resource_manager::ResourceManager;
use hive_core::presentation::api::AppState;
use hive_swarm::{MessageBus, SwarmManager};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Services {
    pub state: Arc<AppState>,
    pub swarm: Arc<SwarmManager>,
    pub resources: Arc<ResourceManager>,
}

pub fn build(config: &HiveConfig) -> Result<Services> {
    let events = Arc::new(EventBus::new());
    let resources = Arc::new(ResourceManager::new(events.clone()));

    // In-tree plugins are always available; manifests under plugin_dirs
    // add more.
    let registry = Arc::new(PluginRegistry::new());
    registry.register(
        PluginHandle::Action(Arc::new(EchoAction::new("echo", env!("CARGO_PKG_VERSION")))),
        false,
    )?;
    registry.register(
        PluginHandle::Connection(Arc::new(LocalConnection::new(
            "local",
            env!("CARGO_PKG_VERSION"),
        ))),
        false,
    )?;

    let discovery = PluginDiscovery::with_builtin_providers();
    let report = discovery.discover(&registry, &config.plugin_dirs);
    info!(registered = report.registered, "plugin discovery complete");
    for error in &report.errors {
        warn!(error = %error, "plugin candidate rejected");
    }

    let actions = Arc::new(ActionHandler::new(
        registry.clone(),
        events.clone(),
        RetryPolicy::from(&config.retry),
    ));
    let messages = Arc::new(MessageBus::new(config.mailbox_capacity));
    let brain: Arc<dyn Brain> = Arc::new(NullBrain);
    let swarm = Arc::new(SwarmManager::new(
        config.agents_dir.clone(),
        brain.clone(),
        actions.clone(),
        messages,
        events.clone(),
        resources.clone(),
    ));
    let pipeline = Arc::new(TaskPipeline::new(brain, actions.clone()));

    let state = Arc::new(AppState {
        registry,
        resources: resources.clone(),
        actions,
        pipeline,
        swarm: swarm.clone(),
        agents_dir: config.agents_dir.clone(),
        stop_timeout: config.stop_timeout,
        current_agent: Mutex::new(None),
    });

    Ok(Services { state, swarm, resources })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_registers_builtin_plugins() {
        let services = build(&HiveConfig::default()).unwrap();
        assert!(services.state.registry.get_action("echo").is_ok());
        assert!(services.state.registry.get_connection("local").is_ok());
    }

    #[tokio::test]
    async fn build_scans_manifest_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("relay.json"),
            r#"{"category": "action", "name": "relay", "version": "0.1.0", "provider": "echo"}"#,
        )
        .unwrap();

        let config = HiveConfig {
            plugin_dirs: vec![dir.path().to_path_buf()],
            ..HiveConfig::default()
        };
        let services = build(&config).unwrap();
        assert!(services.state.registry.get_action("relay").is_ok());
    }
}
