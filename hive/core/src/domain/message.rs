// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::agent::AgentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Addressing for an [`AgentMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    /// Deliver to exactly one registered mailbox.
    Direct(AgentId),
    /// Fan out to every registered mailbox except the sender's.
    Broadcast,
}

/// An inter-agent message carried by the swarm message bus.
///
/// Consumed at most once per addressed mailbox; broadcast recipients each
/// receive their own copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub sender: AgentId,
    pub recipient: Recipient,
    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    pub fn direct(
        sender: AgentId,
        recipient: AgentId,
        payload: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            sender,
            recipient: Recipient::Direct(recipient),
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn broadcast(sender: AgentId, payload: HashMap<String, serde_json::Value>) -> Self {
        Self {
            sender,
            recipient: Recipient::Broadcast,
            payload,
            timestamp: Utc::now(),
        }
    }
}
