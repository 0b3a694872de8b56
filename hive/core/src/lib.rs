// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `hive-core` — Agent Swarm Core Primitives
//!
//! Domain types and runtime infrastructure shared by every HIVE component:
//! the event bus, resource pools, plugin registry/discovery, and the
//! retrying action handler. Swarm coordination lives in `hive-swarm`.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `Event`, `AgentConfig`, `AgentMessage`, plugin capability traits |
//! | [`application`] | Application | `Brain` seam, task pipeline, `SwarmService` use-case trait |
//! | [`infrastructure`] | Infrastructure | `EventBus`, `ResourceManager`, `PluginRegistry`, `ActionHandler` |
//! | [`presentation`] | Presentation | HTTP control surface (axum) |

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
