// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Unique identifier for an agent within the swarm.
///
/// Agent ids are the configuration file names (e.g. `agents/starter.json`
/// yields id `starter`), not generated uuids, so operators can address
/// agents directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an agent's execution context.
///
/// INITIALIZED → RUNNING → STOPPING → STOPPED, with a side transition
/// RUNNING → FAILED on an uncaught loop fault. FAILED and STOPPED are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentState {
    Initialized,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl AgentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentState::Stopped | AgentState::Failed)
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentState::Initialized => "INITIALIZED",
            AgentState::Running => "RUNNING",
            AgentState::Stopping => "STOPPING",
            AgentState::Stopped => "STOPPED",
            AgentState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// A task an agent may pick each iteration, weighted for random selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskWeight {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Per-agent configuration, loaded from `agents/<id>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,

    /// Persona lines fed to the decision capability.
    #[serde(default)]
    pub bio: Vec<String>,

    #[serde(default)]
    pub traits: Vec<String>,

    /// Weighted task list; tasks with weight 0 are disabled.
    #[serde(default)]
    pub tasks: Vec<TaskWeight>,

    /// Pause between loop iterations.
    #[serde(with = "humantime_serde", default = "default_loop_delay")]
    pub loop_delay: Duration,

    /// Maximum messages drained from the mailbox per iteration.
    #[serde(default = "default_message_read_limit")]
    pub message_read_limit: usize,
}

fn default_loop_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_message_read_limit() -> usize {
    10
}

#[derive(Debug, Error)]
pub enum AgentConfigError {
    #[error("agent configuration not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read agent configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid agent configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AgentConfig {
    /// Load the configuration for `id` from `<dir>/<id>.json`.
    pub fn load(dir: &Path, id: &AgentId) -> Result<Self, AgentConfigError> {
        let path = dir.join(format!("{}.json", id.as_str()));
        if !path.exists() {
            return Err(AgentConfigError::NotFound(path));
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| AgentConfigError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| AgentConfigError::Parse { path, source })
    }

    /// List the agent ids available under `dir` (one `<id>.json` per agent).
    pub fn available(dir: &Path) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = std::fs::read_dir(dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    path.file_stem()
                        .and_then(|stem| stem.to_str())
                        .map(AgentId::new)
                } else {
                    None
                }
            })
            .collect();
        ids.sort();
        ids
    }

    /// Tasks eligible for weighted selection (weight > 0).
    pub fn enabled_tasks(&self) -> Vec<&TaskWeight> {
        self.tasks.iter().filter(|t| t.weight > 0.0).collect()
    }

    /// Persona description assembled from bio and traits.
    pub fn persona(&self) -> String {
        let mut parts = self.bio.clone();
        if !self.traits.is_empty() {
            parts.push("Your key traits are:".to_string());
            parts.extend(self.traits.iter().map(|t| format!("- {t}")));
        }
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_agent(dir: &Path, id: &str, body: &str) {
        std::fs::write(dir.join(format!("{id}.json")), body).unwrap();
    }

    #[test]
    fn load_resolves_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_agent(
            dir.path(),
            "starter",
            r#"{"name": "Starter", "tasks": [{"name": "post", "weight": 2.0}, {"name": "idle"}]}"#,
        );

        let config = AgentConfig::load(dir.path(), &AgentId::new("starter")).unwrap();
        assert_eq!(config.name, "Starter");
        assert_eq!(config.loop_delay, Duration::from_secs(30));
        assert_eq!(config.message_read_limit, 10);
        assert_eq!(config.tasks[1].weight, 1.0);
    }

    #[test]
    fn load_missing_agent_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = AgentConfig::load(dir.path(), &AgentId::new("ghost")).unwrap_err();
        assert!(matches!(err, AgentConfigError::NotFound(_)));
    }

    #[test]
    fn enabled_tasks_excludes_zero_weight() {
        let config = AgentConfig {
            name: "t".into(),
            bio: vec![],
            traits: vec![],
            tasks: vec![
                TaskWeight { name: "a".into(), weight: 1.0 },
                TaskWeight { name: "b".into(), weight: 0.0 },
            ],
            loop_delay: Duration::from_millis(1),
            message_read_limit: 5,
        };
        let enabled = config.enabled_tasks();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].name, "a");
    }

    #[test]
    fn available_lists_json_stems_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_agent(dir.path(), "b", "{\"name\": \"b\"}");
        write_agent(dir.path(), "a", "{\"name\": \"a\"}");
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let ids = AgentConfig::available(dir.path());
        assert_eq!(ids, vec![AgentId::new("a"), AgentId::new("b")]);
    }
}
