// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Swarm Manager - Concurrent Agent Lifecycle
//
// Owns the arena of running agents. Starting a swarm loads each agent's
// configuration, registers a mailbox, and spawns a cancellable run loop;
// stopping cancels every loop and waits up to a shared deadline, tearing
// down per-agent resources and mailboxes as each agent confirms.

use crate::application::agent_loop::{run_agent, AgentRuntime};
use crate::domain::message_bus::MessageBus;
use async_trait::async_trait;
use hive_core::application::brain::Brain;
use hive_core::application::pipeline::TaskPipeline;
use hive_core::application::swarm_service::{
    SwarmControlError, SwarmService, SwarmStartReport, SwarmStopReport,
};
use hive_core::domain::agent::{AgentConfig, AgentId, AgentState};
use hive_core::infrastructure::action_handler::ActionHandler;
use hive_core::infrastructure::event_bus::EventBus;
use hive_core::infrastructure::resource_manager::ResourceManager;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

struct AgentHandle {
    state: Arc<Mutex<AgentState>>,
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

/// Runs and supervises a set of agents over the shared core services.
pub struct SwarmManager {
    agents_dir: PathBuf,
    pipeline: Arc<TaskPipeline>,
    messages: Arc<MessageBus>,
    events: Arc<EventBus>,
    resources: Arc<ResourceManager>,
    arena: Mutex<HashMap<AgentId, AgentHandle>>,
}

impl SwarmManager {
    pub fn new(
        agents_dir: impl Into<PathBuf>,
        brain: Arc<dyn Brain>,
        actions: Arc<ActionHandler>,
        messages: Arc<MessageBus>,
        events: Arc<EventBus>,
        resources: Arc<ResourceManager>,
    ) -> Self {
        Self {
            agents_dir: agents_dir.into(),
            pipeline: Arc::new(TaskPipeline::new(brain, actions)),
            messages,
            events,
            resources,
            arena: Mutex::new(HashMap::new()),
        }
    }

    /// Agent ids with a configuration file under the agents directory.
    pub fn available_agents(&self) -> Vec<AgentId> {
        AgentConfig::available(&self.agents_dir)
    }

    fn spawn_agent(&self, id: AgentId, config: AgentConfig) {
        let state = Arc::new(Mutex::new(AgentState::Initialized));
        let cancel = CancellationToken::new();
        let runtime = AgentRuntime {
            id: id.clone(),
            config,
            state: state.clone(),
            pipeline: self.pipeline.clone(),
            messages: self.messages.clone(),
            events: self.events.clone(),
            resources: self.resources.clone(),
        };
        let join = tokio::spawn(run_agent(runtime, cancel.clone()));
        self.arena.lock().insert(id, AgentHandle { state, cancel, join });
    }
}

#[async_trait]
impl SwarmService for SwarmManager {
    /// Start one agent per id. A rejected configuration fails that agent
    /// only; the rest of the swarm still comes up.
    async fn start(&self, agent_ids: Vec<AgentId>) -> Result<SwarmStartReport, SwarmControlError> {
        if agent_ids.is_empty() {
            return Err(SwarmControlError::Empty);
        }

        let mut report = SwarmStartReport::default();
        for id in agent_ids {
            let already_live = self
                .arena
                .lock()
                .get(&id)
                .is_some_and(|h| !h.state.lock().is_terminal());
            if already_live {
                report.failed.push((id, "agent already running".to_string()));
                continue;
            }

            let config = match AgentConfig::load(&self.agents_dir, &id) {
                Ok(config) => config,
                Err(e) => {
                    warn!(agent = %id, error = %e, "agent configuration rejected");
                    report.failed.push((id, e.to_string()));
                    continue;
                }
            };

            self.messages.register(id.clone());
            self.spawn_agent(id.clone(), config);
            report.started.push(id);
        }

        info!(
            started = report.started.len(),
            failed = report.failed.len(),
            "swarm start complete"
        );
        Ok(report)
    }

    /// Cancel every agent loop and wait up to `timeout` for all of them to
    /// finish. Each stopped agent's resources and mailbox are torn down;
    /// an agent still running at the deadline is aborted and reported.
    async fn stop(&self, timeout: Duration) -> Result<SwarmStopReport, SwarmControlError> {
        let handles: Vec<(AgentId, AgentHandle)> = self.arena.lock().drain().collect();
        for (_, handle) in &handles {
            let mut state = handle.state.lock();
            if *state == AgentState::Running {
                *state = AgentState::Stopping;
            }
            handle.cancel.cancel();
        }

        let deadline = tokio::time::Instant::now() + timeout;
        let mut report = SwarmStopReport::default();
        for (id, handle) in handles {
            let abort = handle.join.abort_handle();
            let state = handle.state.clone();
            match tokio::time::timeout_at(deadline, handle.join).await {
                // An agent that had already faulted joins immediately but
                // never reached STOPPED; report it under its own heading.
                Ok(_) if *state.lock() == AgentState::Failed => {
                    report.failed.push(id.clone());
                }
                Ok(_) => report.stopped.push(id.clone()),
                Err(_) => {
                    warn!(agent = %id, ?timeout, "agent did not stop in time, aborting");
                    abort.abort();
                    report.failed_to_stop.push(id.clone());
                }
            }
            self.resources.cleanup_category(id.as_str()).await;
            self.messages.unregister(&id);
        }

        info!(
            stopped = report.stopped.len(),
            failed = report.failed_to_stop.len(),
            "swarm stop complete"
        );
        Ok(report)
    }

    fn agent_states(&self) -> HashMap<AgentId, AgentState> {
        self.arena
            .lock()
            .iter()
            .map(|(id, handle)| (id.clone(), *handle.state.lock()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::application::brain::NullBrain;
    use hive_core::infrastructure::action_handler::RetryPolicy;
    use hive_core::infrastructure::plugins::registry::PluginRegistry;

    fn manager(dir: PathBuf) -> SwarmManager {
        let events = Arc::new(EventBus::new());
        let actions = Arc::new(ActionHandler::new(
            Arc::new(PluginRegistry::new()),
            events.clone(),
            RetryPolicy::default(),
        ));
        SwarmManager::new(
            dir,
            Arc::new(NullBrain),
            actions,
            Arc::new(MessageBus::new(16)),
            events.clone(),
            Arc::new(ResourceManager::new(events)),
        )
    }

    #[tokio::test]
    async fn starting_with_no_ids_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(dir.path().to_path_buf());
        assert!(matches!(
            mgr.start(Vec::new()).await,
            Err(SwarmControlError::Empty)
        ));
    }

    #[tokio::test]
    async fn missing_configuration_fails_only_that_agent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("real.json"),
            r#"{"name": "Real", "loop_delay": "5ms"}"#,
        )
        .unwrap();

        let mgr = manager(dir.path().to_path_buf());
        let report = mgr
            .start(vec![AgentId::new("real"), AgentId::new("ghost")])
            .await
            .unwrap();

        assert_eq!(report.started, vec![AgentId::new("real")]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, AgentId::new("ghost"));

        mgr.stop(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn double_start_rejects_the_live_agent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("solo.json"),
            r#"{"name": "Solo", "loop_delay": "5ms"}"#,
        )
        .unwrap();

        let mgr = manager(dir.path().to_path_buf());
        mgr.start(vec![AgentId::new("solo")]).await.unwrap();

        let second = mgr.start(vec![AgentId::new("solo")]).await.unwrap();
        assert!(second.started.is_empty());
        assert_eq!(second.failed.len(), 1);

        mgr.stop(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn available_agents_reflects_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), r#"{"name": "b"}"#).unwrap();
        std::fs::write(dir.path().join("a.json"), r#"{"name": "a"}"#).unwrap();

        let mgr = manager(dir.path().to_path_buf());
        assert_eq!(
            mgr.available_agents(),
            vec![AgentId::new("a"), AgentId::new("b")]
        );
    }
}
