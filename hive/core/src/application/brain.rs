// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! The decision capability seam.
//!
//! A [`Brain`] turns a task plus context into an ordered action plan and
//! drives the observation/determination/evaluation steps of the task
//! pipeline. Concrete implementations (LLM-backed) live outside this core;
//! [`NullBrain`] is the no-op default used when no model is wired in.

use crate::domain::plugin::ActionParams;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrainError {
    #[error("decision capability failure: {0}")]
    Decision(String),
}

/// One step of an ordered action plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedStep {
    pub action: String,
    #[serde(default)]
    pub params: ActionParams,
}

/// Result of executing one planned step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub action: String,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Evaluation {
    /// The task is done; the pipeline stops looping.
    Complete,
    /// More work remains; another pass may run.
    Continue,
}

#[async_trait]
pub trait Brain: Send + Sync {
    /// Summarize the current context (observation step).
    async fn observe(&self, context: &serde_json::Value) -> Result<String, BrainError>;

    /// Refine a natural-language task into a concrete task statement
    /// (determination step).
    async fn determine(&self, task: &str, observation: &str) -> Result<String, BrainError>;

    /// Divide a task into an ordered action plan (division step).
    async fn plan(
        &self,
        task: &str,
        context: &serde_json::Value,
    ) -> Result<Vec<PlannedStep>, BrainError>;

    /// Judge whether the executed steps completed the task (evaluation step).
    async fn evaluate(&self, task: &str, log: &[StepOutcome]) -> Result<Evaluation, BrainError>;
}

/// Decision capability that plans nothing and declares every task complete.
pub struct NullBrain;

#[async_trait]
impl Brain for NullBrain {
    async fn observe(&self, _context: &serde_json::Value) -> Result<String, BrainError> {
        Ok(String::new())
    }

    async fn determine(&self, task: &str, _observation: &str) -> Result<String, BrainError> {
        Ok(task.to_string())
    }

    async fn plan(
        &self,
        _task: &str,
        _context: &serde_json::Value,
    ) -> Result<Vec<PlannedStep>, BrainError> {
        Ok(Vec::new())
    }

    async fn evaluate(&self, _task: &str, _log: &[StepOutcome]) -> Result<Evaluation, BrainError> {
        Ok(Evaluation::Complete)
    }
}
