// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod builtin;
pub mod discovery;
pub mod registry;

pub use discovery::{DiscoveryReport, PluginDiscovery, PluginLoadError};
pub use registry::{PluginError, PluginHandle, PluginRegistry};
