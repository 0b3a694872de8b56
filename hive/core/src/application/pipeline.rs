// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Task Pipeline - observation / determination / division / execution / evaluation
//
// Turns a natural-language task into executed actions. Each pass: the brain
// summarizes context, refines the task, divides it into an ordered plan;
// the pipeline executes every step through the action handler (step
// failures are recorded, not fatal); the brain then judges whether to loop.

use crate::application::brain::{Brain, BrainError, Evaluation, StepOutcome};
use crate::infrastructure::action_handler::ActionHandler;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Brain(#[from] BrainError),
}

/// Outcome of a pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub task: String,
    pub passes: u32,
    pub steps: Vec<StepOutcome>,
    pub evaluation: Evaluation,
}

pub struct TaskPipeline {
    brain: Arc<dyn Brain>,
    actions: Arc<ActionHandler>,
    max_passes: u32,
}

impl TaskPipeline {
    pub fn new(brain: Arc<dyn Brain>, actions: Arc<ActionHandler>) -> Self {
        Self { brain, actions, max_passes: 5 }
    }

    pub fn with_max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Run the pipeline. With `loop_until_complete`, passes repeat until
    /// the brain evaluates the task complete or `max_passes` is reached;
    /// otherwise a single pass runs.
    pub async fn run(
        &self,
        task: &str,
        mut context: serde_json::Value,
        loop_until_complete: bool,
    ) -> Result<PipelineReport, PipelineError> {
        let mut passes = 0;
        let mut all_steps = Vec::new();
        let mut evaluation = Evaluation::Continue;

        while passes < self.max_passes {
            passes += 1;

            let observation = self.brain.observe(&context).await?;
            let concrete = self.brain.determine(task, &observation).await?;
            let plan = self.brain.plan(&concrete, &context).await?;
            info!(task = %concrete, pass = passes, steps = plan.len(), "executing action plan");

            let mut pass_steps = Vec::with_capacity(plan.len());
            for step in plan {
                match self.actions.execute(&step.action, step.params).await {
                    Ok(output) => {
                        debug!(action = %step.action, "pipeline step succeeded");
                        pass_steps.push(StepOutcome {
                            action: step.action,
                            output: Some(output),
                            error: None,
                        });
                    }
                    Err(e) => {
                        // A failed step is part of the action log the brain
                        // evaluates, not a pipeline fault.
                        warn!(action = %step.action, error = %e, "pipeline step failed");
                        pass_steps.push(StepOutcome {
                            action: step.action,
                            output: None,
                            error: Some(e.to_string()),
                        });
                    }
                }
            }

            evaluation = self.brain.evaluate(&concrete, &pass_steps).await?;

            // Feed this pass's outcomes back as context for the next one.
            if let Ok(log) = serde_json::to_value(&pass_steps) {
                if let Some(obj) = context.as_object_mut() {
                    obj.insert("action_log".to_string(), log);
                }
            }
            all_steps.extend(pass_steps);

            if evaluation == Evaluation::Complete || !loop_until_complete {
                break;
            }
        }

        Ok(PipelineReport { task: task.to_string(), passes, steps: all_steps, evaluation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::brain::PlannedStep;
    use crate::domain::plugin::ActionParams;
    use crate::infrastructure::action_handler::RetryPolicy;
    use crate::infrastructure::event_bus::EventBus;
    use crate::infrastructure::plugins::builtin::EchoAction;
    use crate::infrastructure::plugins::registry::{PluginHandle, PluginRegistry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Plans one echo step per pass and completes after `complete_after`
    /// evaluations.
    struct ScriptedBrain {
        complete_after: u32,
        evaluations: AtomicU32,
    }

    #[async_trait]
    impl Brain for ScriptedBrain {
        async fn observe(&self, _context: &serde_json::Value) -> Result<String, BrainError> {
            Ok("context summary".into())
        }

        async fn determine(&self, task: &str, _observation: &str) -> Result<String, BrainError> {
            Ok(format!("do: {task}"))
        }

        async fn plan(
            &self,
            _task: &str,
            _context: &serde_json::Value,
        ) -> Result<Vec<PlannedStep>, BrainError> {
            let mut params = ActionParams::new();
            params.insert("message".into(), serde_json::json!("ping"));
            Ok(vec![PlannedStep { action: "echo".into(), params }])
        }

        async fn evaluate(
            &self,
            _task: &str,
            _log: &[StepOutcome],
        ) -> Result<Evaluation, BrainError> {
            let n = self.evaluations.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.complete_after {
                Ok(Evaluation::Complete)
            } else {
                Ok(Evaluation::Continue)
            }
        }
    }

    fn pipeline(complete_after: u32) -> TaskPipeline {
        let registry = Arc::new(PluginRegistry::new());
        registry
            .register(PluginHandle::Action(Arc::new(EchoAction::new("echo", "1.0.0"))), false)
            .unwrap();
        let actions = Arc::new(ActionHandler::new(
            registry,
            Arc::new(EventBus::new()),
            RetryPolicy::default(),
        ));
        TaskPipeline::new(
            Arc::new(ScriptedBrain { complete_after, evaluations: AtomicU32::new(0) }),
            actions,
        )
    }

    #[tokio::test]
    async fn single_pass_without_looping() {
        let report = pipeline(10)
            .run("say ping", serde_json::json!({}), false)
            .await
            .unwrap();
        assert_eq!(report.passes, 1);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(report.evaluation, Evaluation::Continue);
        assert!(report.steps[0].output.is_some());
    }

    #[tokio::test]
    async fn loops_until_brain_declares_complete() {
        let report = pipeline(3)
            .run("say ping", serde_json::json!({}), true)
            .await
            .unwrap();
        assert_eq!(report.passes, 3);
        assert_eq!(report.evaluation, Evaluation::Complete);
        assert_eq!(report.steps.len(), 3);
    }

    #[tokio::test]
    async fn failed_step_is_recorded_not_fatal() {
        struct BadPlanBrain;

        #[async_trait]
        impl Brain for BadPlanBrain {
            async fn observe(&self, _c: &serde_json::Value) -> Result<String, BrainError> {
                Ok(String::new())
            }
            async fn determine(&self, task: &str, _o: &str) -> Result<String, BrainError> {
                Ok(task.into())
            }
            async fn plan(
                &self,
                _t: &str,
                _c: &serde_json::Value,
            ) -> Result<Vec<PlannedStep>, BrainError> {
                Ok(vec![PlannedStep { action: "no-such-action".into(), params: ActionParams::new() }])
            }
            async fn evaluate(
                &self,
                _t: &str,
                _l: &[StepOutcome],
            ) -> Result<Evaluation, BrainError> {
                Ok(Evaluation::Complete)
            }
        }

        let registry = Arc::new(PluginRegistry::new());
        let actions = Arc::new(ActionHandler::new(
            registry,
            Arc::new(EventBus::new()),
            RetryPolicy::default(),
        ));
        let report = TaskPipeline::new(Arc::new(BadPlanBrain), actions)
            .run("t", serde_json::json!({}), false)
            .await
            .unwrap();
        assert_eq!(report.steps.len(), 1);
        assert!(report.steps[0].error.is_some());
    }
}
