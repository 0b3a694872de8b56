// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus - Pub/Sub for Lifecycle Events
//
// In-memory subscriber table keyed by event name, with a wildcard list
// invoked for every event. Delivery is asynchronous with respect to the
// publisher: publish() hands the event to a single dispatcher task and
// returns immediately, so publishes are delivered in publish order.
// Handlers for a single event run sequentially in subscription order, each
// inside an error boundary, so one faulty subscriber can never starve the
// rest or surface an error to the publisher.

use crate::domain::event::Event;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Subscribing under this name receives every published event.
pub const WILDCARD: &str = "*";

/// A subscriber on the event bus.
///
/// Returning an error is logged and swallowed; failed handlers are not
/// retried.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &Event) -> anyhow::Result<()>;
}

type SubscriberTable = Mutex<HashMap<String, Vec<Arc<dyn EventHandler>>>>;

/// Process-wide publish/subscribe notification channel.
///
/// Must be constructed inside a tokio runtime: `new` spawns the dispatcher
/// task, which exits when the bus is dropped.
pub struct EventBus {
    subscribers: Arc<SubscriberTable>,
    queue: mpsc::UnboundedSender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let subscribers: Arc<SubscriberTable> = Arc::new(Mutex::new(HashMap::new()));
        let (queue, mut pending) = mpsc::unbounded_channel::<Event>();

        let table = subscribers.clone();
        tokio::spawn(async move {
            while let Some(event) = pending.recv().await {
                // Snapshot the handler lists so the table lock is never
                // held while a handler runs.
                let handlers: Vec<Arc<dyn EventHandler>> = {
                    let table = table.lock();
                    let named = table.get(&event.name).into_iter().flatten();
                    let wildcard = table.get(WILDCARD).into_iter().flatten();
                    named.chain(wildcard).cloned().collect()
                };
                if handlers.is_empty() {
                    debug!(event = %event.name, "no subscribers for event");
                    continue;
                }
                for handler in handlers {
                    if let Err(e) = handler.handle(&event).await {
                        warn!(event = %event.name, error = %e, "event handler failed");
                    }
                }
            }
        });

        Self { subscribers, queue }
    }

    /// Register `handler` for events named `name` (or [`WILDCARD`]).
    ///
    /// Subscribing the same handler twice under the same name is a no-op.
    pub fn subscribe(&self, name: impl Into<String>, handler: Arc<dyn EventHandler>) {
        let name = name.into();
        let mut table = self.subscribers.lock();
        let handlers = table.entry(name).or_default();
        if handlers.iter().any(|h| Arc::ptr_eq(h, &handler)) {
            return;
        }
        handlers.push(handler);
    }

    pub fn unsubscribe(&self, name: &str, handler: &Arc<dyn EventHandler>) {
        let mut table = self.subscribers.lock();
        if let Some(handlers) = table.get_mut(name) {
            handlers.retain(|h| !Arc::ptr_eq(h, handler));
            if handlers.is_empty() {
                table.remove(name);
            }
        }
    }

    /// Drop every subscription for `name`.
    pub fn clear(&self, name: &str) {
        self.subscribers.lock().remove(name);
    }

    pub fn clear_all(&self) {
        self.subscribers.lock().clear();
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        self.subscribers.lock().get(name).map_or(0, Vec::len)
    }

    /// Deliver `event` to every handler subscribed to its name, then to
    /// wildcard handlers. Returns without waiting for handler completion;
    /// events are dispatched in publish order.
    pub fn publish(&self, event: Event) {
        metrics::counter!("hive_events_published_total").increment(1);
        if self.queue.send(event).is_err() {
            warn!("event dispatcher is gone, dropping event");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct Recorder {
        seen: Mutex<Vec<String>>,
        label: String,
        notify: Arc<Semaphore>,
    }

    impl Recorder {
        fn new(label: &str, notify: Arc<Semaphore>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                label: label.to_string(),
                notify,
            })
        }
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: &Event) -> anyhow::Result<()> {
            self.seen.lock().push(format!("{}:{}", self.label, event.name));
            self.notify.add_permits(1);
            Ok(())
        }
    }

    struct Faulty {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EventHandler for Faulty {
        async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("boom")
        }
    }

    async fn wait_for(notify: &Semaphore, count: usize) {
        for _ in 0..count {
            tokio::time::timeout(Duration::from_secs(1), notify.acquire())
                .await
                .expect("handler was not invoked")
                .expect("semaphore closed")
                .forget();
        }
    }

    #[tokio::test]
    async fn publish_reaches_named_and_wildcard_subscribers() {
        let bus = EventBus::new();
        let notify = Arc::new(Semaphore::new(0));
        let named = Recorder::new("named", notify.clone());
        let wildcard = Recorder::new("wild", notify.clone());

        bus.subscribe("agent.a.started", named.clone() as Arc<dyn EventHandler>);
        bus.subscribe(WILDCARD, wildcard.clone() as Arc<dyn EventHandler>);

        bus.publish(Event::new("agent.a.started", "swarm_manager"));
        wait_for(&notify, 2).await;

        assert_eq!(named.seen.lock().as_slice(), ["named:agent.a.started"]);
        assert_eq!(wildcard.seen.lock().as_slice(), ["wild:agent.a.started"]);
    }

    #[tokio::test]
    async fn faulty_handler_does_not_block_later_subscribers() {
        let bus = EventBus::new();
        let notify = Arc::new(Semaphore::new(0));
        let first = Recorder::new("first", notify.clone());
        let faulty = Arc::new(Faulty { calls: AtomicUsize::new(0) });
        let last = Recorder::new("last", notify.clone());

        bus.subscribe("tick", first.clone() as Arc<dyn EventHandler>);
        bus.subscribe("tick", faulty.clone() as Arc<dyn EventHandler>);
        bus.subscribe("tick", last.clone() as Arc<dyn EventHandler>);

        // publish() must return normally even though the middle handler errors.
        bus.publish(Event::new("tick", "test"));
        wait_for(&notify, 2).await;

        assert_eq!(faulty.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.seen.lock().len(), 1);
        assert_eq!(last.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_subscribe_is_a_noop() {
        let bus = EventBus::new();
        let notify = Arc::new(Semaphore::new(0));
        let recorder = Recorder::new("dup", notify.clone());

        bus.subscribe("tick", recorder.clone() as Arc<dyn EventHandler>);
        bus.subscribe("tick", recorder.clone() as Arc<dyn EventHandler>);
        assert_eq!(bus.subscriber_count("tick"), 1);

        bus.publish(Event::new("tick", "test"));
        wait_for(&notify, 1).await;
        // A short settle window: a duplicate delivery would land here.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(recorder.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_handler() {
        let bus = EventBus::new();
        let notify = Arc::new(Semaphore::new(0));
        let recorder = Recorder::new("r", notify);

        let handler: Arc<dyn EventHandler> = recorder.clone();
        bus.subscribe("tick", handler.clone());
        bus.unsubscribe("tick", &handler);
        assert_eq!(bus.subscriber_count("tick"), 0);

        bus.publish(Event::new("tick", "test"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(recorder.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn handlers_run_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let notify = Arc::new(Semaphore::new(0));

        struct Ordered {
            order: Arc<Mutex<Vec<usize>>>,
            idx: usize,
            notify: Arc<Semaphore>,
        }

        #[async_trait]
        impl EventHandler for Ordered {
            async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
                self.order.lock().push(self.idx);
                self.notify.add_permits(1);
                Ok(())
            }
        }

        for idx in 0..4 {
            bus.subscribe(
                "tick",
                Arc::new(Ordered { order: order.clone(), idx, notify: notify.clone() })
                    as Arc<dyn EventHandler>,
            );
        }

        bus.publish(Event::new("tick", "test"));
        wait_for(&notify, 4).await;
        assert_eq!(order.lock().as_slice(), [0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn same_name_events_arrive_in_publish_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let notify = Arc::new(Semaphore::new(0));

        struct Sequencer {
            seen: Arc<Mutex<Vec<i64>>>,
            notify: Arc<Semaphore>,
        }

        #[async_trait]
        impl EventHandler for Sequencer {
            async fn handle(&self, event: &Event) -> anyhow::Result<()> {
                let seq = event.data["seq"].as_i64().unwrap_or(-1);
                self.seen.lock().push(seq);
                self.notify.add_permits(1);
                Ok(())
            }
        }

        bus.subscribe(
            "tick",
            Arc::new(Sequencer { seen: seen.clone(), notify: notify.clone() })
                as Arc<dyn EventHandler>,
        );

        for seq in 0..20i64 {
            bus.publish(Event::new("tick", "test").with_data("seq", seq));
        }
        wait_for(&notify, 20).await;

        let seen = seen.lock();
        assert_eq!(seen.as_slice(), (0..20).collect::<Vec<i64>>().as_slice());
    }
}
