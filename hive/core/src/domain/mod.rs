// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod agent;
pub mod config;
pub mod event;
pub mod message;
pub mod plugin;

pub use agent::{AgentConfig, AgentConfigError, AgentId, AgentState, TaskWeight};
pub use config::{HiveConfig, ConfigError};
pub use event::Event;
pub use message::{AgentMessage, Recipient};
pub use plugin::{
    ActionError, ActionParams, ActionPlugin, ConnectionPlugin, PluginCategory, PluginDescriptor,
};
