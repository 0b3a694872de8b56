// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Use-case trait for swarm control.
//!
//! Defined here so the presentation layer can drive the swarm without a
//! dependency on `hive-swarm`; the `SwarmManager` there implements it.

use crate::domain::agent::{AgentId, AgentState};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwarmControlError {
    #[error("no agent ids supplied")]
    Empty,

    #[error("swarm failure: {0}")]
    Internal(String),
}

/// Outcome of a `start` request. Agents whose configuration failed to load
/// are reported here rather than aborting the rest of the swarm.
#[derive(Debug, Default, Serialize)]
pub struct SwarmStartReport {
    pub started: Vec<AgentId>,
    pub failed: Vec<(AgentId, String)>,
}

/// Outcome of a `stop` request.
#[derive(Debug, Default, Serialize)]
pub struct SwarmStopReport {
    /// Agents that reached STOPPED cleanly.
    pub stopped: Vec<AgentId>,
    /// Agents that had already faulted to FAILED before the stop.
    pub failed: Vec<AgentId>,
    /// Agents that did not reach STOPPED within the stop timeout.
    pub failed_to_stop: Vec<AgentId>,
}

#[async_trait]
pub trait SwarmService: Send + Sync {
    async fn start(&self, agent_ids: Vec<AgentId>) -> Result<SwarmStartReport, SwarmControlError>;

    async fn stop(&self, timeout: Duration) -> Result<SwarmStopReport, SwarmControlError>;

    fn agent_states(&self) -> HashMap<AgentId, AgentState>;
}
