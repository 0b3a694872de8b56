// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub(crate) mod agent_loop;
pub mod manager;
