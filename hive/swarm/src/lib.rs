// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `hive-swarm` — Swarm Coordination and Inter-Agent Messaging
//!
//! Runs many agents concurrently on the shared core: each agent gets its
//! own cancellable tokio task and mailbox, while the plugin registry,
//! action handler, and event bus from `hive-core` are shared. A fault in
//! one agent marks that agent FAILED and leaves the rest running.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `MessageBus` mailboxes and delivery rules |
//! | [`application`] | Application | `SwarmManager` lifecycle, per-agent run loop |

pub mod application;
pub mod domain;

pub use application::manager::SwarmManager;
pub use domain::message_bus::{MessageBus, SendError};
