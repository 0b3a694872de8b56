// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod action_handler;
pub mod event_bus;
pub mod plugins;
pub mod resource_manager;
