//! Event publisher attached to a node.
//!
//! An [`EventOutput`] fans an event out to every subscribed receiver, either
//! synchronously (direct `process_event` calls on the sending thread) or
//! asynchronously through an [`EventQueue`]. Events addressed to the
//! application go to the queue's application handler instead.
//!
//! Queued events without a time-to-live receive the output's default one,
//! if set.

use std::sync::Arc;
use std::time::Duration;

use crate::event::{Event, EventReceiver, IntoEventData, K_NO_EVENT, Priority};
use crate::queue::{EventQueue, Message};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SendMode {
    Sync,
    Async,
}

/// Fan-out list of event subscribers.
#[derive(Default)]
pub struct EventOutput {
    subscribers: Vec<(Arc<dyn EventReceiver>, u32)>,
    queue: Option<Arc<EventQueue>>,
    default_ttl: Option<Duration>,
}

impl core::fmt::Debug for EventOutput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventOutput")
            .field("subscribers", &self.subscribers.len())
            .field("queue", &self.queue.is_some())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl EventOutput {
    /// Creates an output without queue; only synchronous sends succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an output pushing asynchronous sends to `queue`.
    pub fn with_queue(queue: Arc<EventQueue>) -> Self {
        Self {
            subscribers: Vec::new(),
            queue: Some(queue),
            default_ttl: None,
        }
    }

    /// Sets the time-to-live given to queued events that carry none.
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Time-to-live given to queued events that carry none.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Replaces the queue used for asynchronous sends.
    pub fn set_queue(&mut self, queue: Option<Arc<EventQueue>>) {
        self.queue = queue;
    }

    /// Adds a receiver on `port`.
    pub fn subscribe(&mut self, node: Arc<dyn EventReceiver>, port: u32) {
        self.subscribers.push((node, port));
    }

    /// Number of subscribers.
    pub fn nb_subscribers(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers an event built from `args` to every subscriber now.
    pub fn send_sync<A: IntoEventData>(&self, priority: Priority, event_id: u32, args: A) {
        self.send_event_to_all_nodes(Event::with_args(event_id, priority, args), SendMode::Sync);
    }

    /// Queues an event built from `args` for every subscriber.
    ///
    /// Returns `false` without queue, after the queue ended, or when a push
    /// overflowed.
    pub fn send_async<A: IntoEventData>(&self, priority: Priority, event_id: u32, args: A) -> bool {
        self.send_event_to_all_nodes(Event::with_args(event_id, priority, args), SendMode::Async)
    }

    /// Same as [`send_async`](Self::send_async) with a time-to-live.
    pub fn send_async_with_ttl<A: IntoEventData>(
        &self,
        ttl: Duration,
        priority: Priority,
        event_id: u32,
        args: A,
    ) -> bool {
        self.send_event_to_all_nodes(Event::with_args(event_id, priority, args).ttl(ttl), SendMode::Async)
    }

    /// Queues an already built event for every subscriber.
    pub fn send_async_event(&self, event: Event) -> bool {
        self.send_event_to_all_nodes(event, SendMode::Async)
    }

    /// Calls the application handler now.
    ///
    /// Returns the handler's answer, `false` without queue or handler.
    pub fn send_sync_to_app<A: IntoEventData>(&self, src_node_id: i32, priority: Priority, event_id: u32, args: A) -> bool {
        self.queue
            .as_ref()
            .is_some_and(|q| q.call_sync_handler(src_node_id, Event::with_args(event_id, priority, args)))
    }

    /// Queues an event for the application handler.
    pub fn send_async_to_app<A: IntoEventData>(
        &self,
        src_node_id: i32,
        priority: Priority,
        event_id: u32,
        args: A,
    ) -> bool {
        let Some(queue) = self.live_queue() else {
            return false;
        };
        let event = self.stamp(Event::with_args(event_id, priority, args));
        queue.push(Message::distant(src_node_id, event))
    }

    fn stamp(&self, event: Event) -> Event {
        match (event.ttl, self.default_ttl) {
            (None, Some(ttl)) => event.ttl(ttl),
            _ => event,
        }
    }

    fn live_queue(&self) -> Option<&Arc<EventQueue>> {
        self.queue.as_ref().filter(|q| !q.must_end())
    }

    fn send_event_to_all_nodes(&self, event: Event, mode: SendMode) -> bool {
        let (queue, mut event) = match mode {
            SendMode::Async => match self.live_queue() {
                Some(queue) => (Some(queue), self.stamp(event)),
                None => return false,
            },
            SendMode::Sync => (None, event),
        };

        if event.event_id == K_NO_EVENT {
            return true;
        }

        let deliver = |node: &Arc<dyn EventReceiver>, port: u32, event: Event| match queue {
            Some(queue) => queue.push(Message::local(Arc::clone(node), port, event)),
            None => {
                node.process_event(port, event);
                true
            }
        };

        if let [(node, port)] = self.subscribers.as_slice() {
            return deliver(node, *port, event.take());
        }
        for (node, port) in &self.subscribers {
            if !deliver(node, *port, event.clone_event()) {
                return false;
            }
        }
        true
    }
}
