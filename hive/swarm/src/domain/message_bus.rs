// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Message Bus - Per-Agent Mailboxes
//
// One bounded FIFO mailbox per registered agent. Direct sends target a
// single mailbox; broadcasts copy the message into every mailbox except the
// sender's own. A full mailbox sheds its oldest message to admit the new
// one, so a stalled agent can never wedge its senders.

use dashmap::DashMap;
use hive_core::domain::agent::AgentId;
use hive_core::domain::message::{AgentMessage, Recipient};
use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SendError {
    #[error("no mailbox registered for agent: {0}")]
    UnknownRecipient(AgentId),
}

#[derive(Default)]
struct Mailbox {
    queue: Mutex<VecDeque<AgentMessage>>,
}

/// Routes [`AgentMessage`]s between registered agent mailboxes.
pub struct MessageBus {
    mailboxes: DashMap<AgentId, Mailbox>,
    capacity: usize,
}

impl MessageBus {
    /// `capacity` bounds each mailbox; past it the oldest message is
    /// dropped on delivery.
    pub fn new(capacity: usize) -> Self {
        Self {
            mailboxes: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Create a mailbox for `id`. Re-registering an existing agent keeps
    /// its pending messages.
    pub fn register(&self, id: AgentId) {
        self.mailboxes.entry(id).or_default();
    }

    /// Remove `id`'s mailbox, discarding anything still queued. Returns
    /// whether a mailbox existed.
    pub fn unregister(&self, id: &AgentId) -> bool {
        self.mailboxes.remove(id).is_some()
    }

    /// Deliver `message` per its recipient.
    ///
    /// A broadcast with no other registered agents delivers nowhere and is
    /// not an error; a direct send to an unregistered agent is.
    pub fn send(&self, message: AgentMessage) -> Result<(), SendError> {
        match &message.recipient {
            Recipient::Direct(to) => {
                let mailbox = self
                    .mailboxes
                    .get(to)
                    .ok_or_else(|| SendError::UnknownRecipient(to.clone()))?;
                self.deliver(to, &mailbox, message.clone());
            }
            Recipient::Broadcast => {
                for entry in self.mailboxes.iter() {
                    if entry.key() == &message.sender {
                        continue;
                    }
                    self.deliver(entry.key(), entry.value(), message.clone());
                }
            }
        }
        metrics::counter!("hive_messages_sent_total").increment(1);
        Ok(())
    }

    fn deliver(&self, to: &AgentId, mailbox: &Mailbox, message: AgentMessage) {
        let mut queue = mailbox.queue.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
            warn!(agent = %to, capacity = self.capacity, "mailbox full, dropping oldest message");
            metrics::counter!("hive_messages_dropped_total").increment(1);
        }
        queue.push_back(message);
        debug!(agent = %to, pending = queue.len(), "message delivered");
    }

    /// Remove and return up to `limit` messages from `id`'s mailbox in
    /// arrival order. An unregistered agent drains nothing.
    pub fn drain(&self, id: &AgentId, limit: usize) -> Vec<AgentMessage> {
        let Some(mailbox) = self.mailboxes.get(id) else {
            return Vec::new();
        };
        let mut queue = mailbox.queue.lock();
        let take = limit.min(queue.len());
        queue.drain(..take).collect()
    }

    pub fn pending(&self, id: &AgentId) -> usize {
        self.mailboxes.get(id).map_or(0, |m| m.queue.lock().len())
    }

    /// Ids with a registered mailbox, sorted for stable listings.
    pub fn registered_agents(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.mailboxes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
