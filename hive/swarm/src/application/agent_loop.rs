// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Per-Agent Run Loop
//
// Each iteration: drain the mailbox, pick a weighted task, run one pipeline
// pass, forward any outbound messages the steps produced, then sleep.
// A brain failure is a fault: the agent transitions to FAILED and its loop
// ends. Step failures are ordinary outcomes handled inside the pipeline.

use crate::domain::message_bus::MessageBus;
use hive_core::application::pipeline::{PipelineError, TaskPipeline};
use hive_core::domain::agent::{AgentConfig, AgentId, AgentState};
use hive_core::domain::event::Event;
use hive_core::domain::message::AgentMessage;
use hive_core::infrastructure::event_bus::EventBus;
use hive_core::infrastructure::resource_manager::ResourceManager;
use parking_lot::Mutex;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const SOURCE: &str = "swarm_manager";

/// Everything one agent task needs; shared services are `Arc`s into the
/// swarm-wide instances.
pub(crate) struct AgentRuntime {
    pub id: AgentId,
    pub config: AgentConfig,
    pub state: Arc<Mutex<AgentState>>,
    pub pipeline: Arc<TaskPipeline>,
    pub messages: Arc<MessageBus>,
    pub events: Arc<EventBus>,
    pub resources: Arc<ResourceManager>,
}

pub(crate) async fn run_agent(rt: AgentRuntime, cancel: CancellationToken) {
    *rt.state.lock() = AgentState::Running;
    rt.events.publish(
        Event::new(format!("agent.{}.started", rt.id), SOURCE).with_data("agent", rt.id.as_str()),
    );
    info!(agent = %rt.id, "agent loop started");

    while !cancel.is_cancelled() {
        if let Err(e) = run_iteration(&rt).await {
            *rt.state.lock() = AgentState::Failed;
            error!(agent = %rt.id, error = %e, "agent faulted");
            metrics::counter!("hive_agent_faults_total").increment(1);
            // A failed agent leaves the routing table and releases its
            // resources immediately; stop() may never be called.
            rt.messages.unregister(&rt.id);
            rt.resources.cleanup_category(rt.id.as_str()).await;
            rt.events.publish(
                Event::new(format!("agent.{}.error", rt.id), SOURCE)
                    .with_data("agent", rt.id.as_str())
                    .with_data("error", e.to_string()),
            );
            return;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(rt.config.loop_delay) => {}
        }
    }

    *rt.state.lock() = AgentState::Stopped;
    rt.events.publish(
        Event::new(format!("agent.{}.stopped", rt.id), SOURCE).with_data("agent", rt.id.as_str()),
    );
    info!(agent = %rt.id, "agent loop stopped");
}

async fn run_iteration(rt: &AgentRuntime) -> Result<(), PipelineError> {
    let inbox = rt.messages.drain(&rt.id, rt.config.message_read_limit);
    if !inbox.is_empty() {
        debug!(agent = %rt.id, count = inbox.len(), "drained inbox");
    }

    let Some(task) = pick_task(&rt.config) else {
        debug!(agent = %rt.id, "no enabled tasks this iteration");
        return Ok(());
    };

    let context = json!({
        "agent": rt.id.as_str(),
        "persona": rt.config.persona(),
        "messages": inbox,
    });

    let report = rt.pipeline.run(&task, context, false).await?;
    for step in &report.steps {
        if let Some(output) = &step.output {
            forward_outbound(rt, output);
        }
    }
    Ok(())
}

/// Weighted random pick over the agent's enabled tasks.
fn pick_task(config: &AgentConfig) -> Option<String> {
    let tasks = config.enabled_tasks();
    if tasks.is_empty() {
        return None;
    }
    let dist = WeightedIndex::new(tasks.iter().map(|t| t.weight)).ok()?;
    let picked = dist.sample(&mut rand::rng());
    Some(tasks[picked].name.clone())
}

/// A step output may carry an `outbound` object:
/// `{"recipient": "<agent-id>" | "*", "payload": {..}}`. `"*"` broadcasts.
fn forward_outbound(rt: &AgentRuntime, output: &Value) {
    let Some(outbound) = output.get("outbound") else {
        return;
    };
    let Some(recipient) = outbound.get("recipient").and_then(Value::as_str) else {
        warn!(agent = %rt.id, "outbound without a recipient, ignoring");
        return;
    };
    let payload: HashMap<String, Value> = outbound
        .get("payload")
        .and_then(|p| serde_json::from_value(p.clone()).ok())
        .unwrap_or_default();

    let message = if recipient == "*" {
        AgentMessage::broadcast(rt.id.clone(), payload)
    } else {
        AgentMessage::direct(rt.id.clone(), AgentId::new(recipient), payload)
    };
    if let Err(e) = rt.messages.send(message) {
        warn!(agent = %rt.id, error = %e, "outbound message undeliverable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::domain::agent::TaskWeight;
    use std::time::Duration;

    fn config(tasks: Vec<TaskWeight>) -> AgentConfig {
        AgentConfig {
            name: "t".into(),
            bio: vec![],
            traits: vec![],
            tasks,
            loop_delay: Duration::from_millis(1),
            message_read_limit: 10,
        }
    }

    #[test]
    fn pick_task_skips_disabled_tasks() {
        let cfg = config(vec![
            TaskWeight { name: "on".into(), weight: 1.0 },
            TaskWeight { name: "off".into(), weight: 0.0 },
        ]);
        for _ in 0..50 {
            assert_eq!(pick_task(&cfg).as_deref(), Some("on"));
        }
    }

    #[test]
    fn pick_task_with_no_tasks_is_none() {
        assert!(pick_task(&config(vec![])).is_none());
    }

    #[test]
    fn weighted_pick_favors_heavier_tasks() {
        let cfg = config(vec![
            TaskWeight { name: "heavy".into(), weight: 99.0 },
            TaskWeight { name: "light".into(), weight: 1.0 },
        ]);
        let heavy = (0..200)
            .filter(|_| pick_task(&cfg).as_deref() == Some("heavy"))
            .count();
        assert!(heavy > 150, "heavy picked only {heavy}/200 times");
    }
}
