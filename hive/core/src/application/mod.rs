// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod brain;
pub mod pipeline;
pub mod swarm_service;

pub use brain::{Brain, BrainError, Evaluation, NullBrain, PlannedStep, StepOutcome};
pub use pipeline::{PipelineError, PipelineReport, TaskPipeline};
pub use swarm_service::{SwarmControlError, SwarmService, SwarmStartReport, SwarmStopReport};
