//! Priority event queue and its dispatch loop.
//!
//! Messages are stored in one fixed-capacity ring per [`Priority`]. The
//! consumer always serves the highest non-empty class first and drops
//! messages whose time-to-live expired while they waited. A push never
//! blocks and never allocates: when a class is full the message is dropped
//! and `push` returns `false`.
//!
//! The queue is driven either by a dedicated thread ([`EventThread`], which
//! runs [`EventQueue::execute`]) or cooperatively from the dataflow thread
//! with [`EventQueue::execute_pending`].
//!
//! [`EventQueue::pause`] only requests a pause. [`EventQueue::pause_and_wait`]
//! and [`EventQueue::wait_paused`] also wait for the delivery in progress to
//! finish, so that once they return no receiver runs until
//! [`EventQueue::resume`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cgstream_core::event::{Event, EventReceiver, Priority, K_DO};
//! use cgstream_core::queue::{EventQueue, Message};
//! use parking_lot::Mutex;
//!
//! #[derive(Default)]
//! struct Recorder(Mutex<Vec<u32>>);
//!
//! impl EventReceiver for Recorder {
//!     fn process_event(&self, port: u32, _event: Event) {
//!         self.0.lock().push(port);
//!     }
//! }
//!
//! let queue = EventQueue::new();
//! let node = Arc::new(Recorder::default());
//! assert!(queue.push(Message::local(node.clone(), 3, Event::new(K_DO, Priority::Normal))));
//! assert_eq!(queue.execute_pending(), 1);
//! assert_eq!(*node.0.lock(), [3]);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::event::{Event, EventReceiver, NB_PRIORITIES, Priority};

/// Default capacity of each priority class.
pub const MY_QUEUE_MAX_ELEMS: usize = 20;

/// Handler for events addressed to the application rather than a node.
///
/// Receives the identifier of the sending node. Context the handler needs is
/// captured by the closure.
pub type AppHandler = Arc<dyn Fn(i32, Event) -> bool + Send + Sync>;

/// Where a message is delivered.
#[derive(Clone)]
pub enum Destination {
    /// A node in this process.
    Local {
        /// Receiving node.
        node: Arc<dyn EventReceiver>,
        /// Input port on the node.
        port: u32,
    },
    /// The application handler, tagged with the sending node.
    Distant {
        /// Identifier of the node that sent the event.
        src_node_id: i32,
    },
}

impl core::fmt::Debug for Destination {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Local { port, .. } => f.debug_struct("Local").field("port", port).finish_non_exhaustive(),
            Self::Distant { src_node_id } => f.debug_struct("Distant").field("src_node_id", src_node_id).finish(),
        }
    }
}

/// A queued event with its destination.
#[derive(Debug)]
pub struct Message {
    /// Delivery target.
    pub destination: Destination,
    /// Event to deliver.
    pub event: Event,
    /// Time of the push, used for time-to-live checks.
    pub timestamp: Instant,
}

impl Message {
    /// Message for a node in this process.
    pub fn local(node: Arc<dyn EventReceiver>, port: u32, event: Event) -> Self {
        Self {
            destination: Destination::Local { node, port },
            event,
            timestamp: Instant::now(),
        }
    }

    /// Message for the application handler.
    pub fn distant(src_node_id: i32, event: Event) -> Self {
        Self {
            destination: Destination::Distant { src_node_id },
            event,
            timestamp: Instant::now(),
        }
    }
}

/// Platform services used by the dispatch loop.
pub trait QueuePlatform: Send + Sync {
    /// Current time.
    fn now(&self) -> Instant {
        Instant::now()
    }

    /// Raises the dispatching thread to match a message's priority.
    fn set_thread_priority(&self, priority: Priority) {
        let _ = priority;
    }

    /// Restores the dispatching thread's priority after a delivery.
    fn restore_thread_priority(&self) {}
}

/// Platform using the system clock and leaving thread priorities alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdPlatform;

impl QueuePlatform for StdPlatform {}

type Rings = [VecDeque<Message>; NB_PRIORITIES];

/// Everything guarded by the queue lock.
struct Slots {
    rings: Rings,
    /// Messages popped and not yet delivered.
    delivering: usize,
}

impl Slots {
    fn pop_highest(&mut self) -> Option<Message> {
        Priority::DESCENDING
            .iter()
            .find_map(|p| self.rings[p.index()].pop_front())
    }
}

/// Thread-safe strict-priority event queue.
pub struct EventQueue {
    slots: Mutex<Slots>,
    capacity: usize,
    wakeup: Condvar,
    idle: Condvar,
    paused: AtomicBool,
    ended: AtomicBool,
    handler: Mutex<Option<AppHandler>>,
    platform: Box<dyn QueuePlatform>,
}

impl core::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("paused", &self.is_paused())
            .field("ended", &self.must_end())
            .finish_non_exhaustive()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    /// Creates a queue holding [`MY_QUEUE_MAX_ELEMS`] messages per priority.
    pub fn new() -> Self {
        Self::with_capacity(MY_QUEUE_MAX_ELEMS)
    }

    /// Creates a queue holding `capacity` messages per priority.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_platform(capacity, Box::new(StdPlatform))
    }

    /// Creates a queue with custom platform services.
    pub fn with_platform(capacity: usize, platform: Box<dyn QueuePlatform>) -> Self {
        Self {
            slots: Mutex::new(Slots {
                rings: core::array::from_fn(|_| VecDeque::with_capacity(capacity)),
                delivering: 0,
            }),
            capacity,
            wakeup: Condvar::new(),
            idle: Condvar::new(),
            paused: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            handler: Mutex::new(None),
            platform,
        }
    }

    /// Capacity of each priority class.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueues a message. Returns `false` if its priority class is full.
    pub fn push(&self, mut message: Message) -> bool {
        let priority = message.event.priority;
        message.timestamp = self.platform.now();
        {
            let mut slots = self.slots.lock();
            let ring = &mut slots.rings[priority.index()];
            if ring.len() >= self.capacity {
                #[cfg(feature = "tracing")]
                tracing::error!(?priority, "Event queue overflow for priority");
                return false;
            }
            ring.push_back(message);
        }
        self.wakeup.notify_one();
        true
    }

    /// Total number of queued messages.
    pub fn len(&self) -> usize {
        self.slots.lock().rings.iter().map(VecDeque::len).sum()
    }

    /// Number of queued messages of one priority.
    pub fn len_of(&self, priority: Priority) -> usize {
        self.slots.lock().rings[priority.index()].len()
    }

    /// Returns `true` if no message is queued.
    pub fn is_empty(&self) -> bool {
        self.slots.lock().rings.iter().all(VecDeque::is_empty)
    }

    /// Drops every queued message.
    pub fn clear(&self) {
        for ring in self.slots.lock().rings.iter_mut() {
            ring.clear();
        }
    }

    /// Requests a pause. Queued messages are kept.
    ///
    /// Returns at once; a delivery already in progress completes. Use
    /// [`pause_and_wait`](Self::pause_and_wait) to know when the dispatch
    /// loop has actually stopped.
    pub fn pause(&self) {
        let _slots = self.slots.lock();
        self.paused.store(true, Ordering::Release);
    }

    /// Pauses and blocks until no delivery is in progress.
    ///
    /// Once this returns, no receiver or application handler is called
    /// before [`resume`](Self::resume). Must not be called from a receiver
    /// of this queue: it would wait for itself.
    pub fn pause_and_wait(&self) {
        let mut slots = self.slots.lock();
        self.paused.store(true, Ordering::Release);
        while slots.delivering > 0 {
            self.idle.wait(&mut slots);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!("event queue paused");
    }

    /// Waits up to `timeout` for a requested pause to take effect.
    ///
    /// Returns `true` when the queue is paused and idle, `false` if it is
    /// not paused or a delivery is still running at the deadline.
    pub fn wait_paused(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut slots = self.slots.lock();
        while slots.delivering > 0 && self.is_paused() {
            if self.idle.wait_until(&mut slots, deadline).timed_out() {
                break;
            }
        }
        slots.delivering == 0 && self.is_paused()
    }

    /// Resumes delivery.
    pub fn resume(&self) {
        {
            let _slots = self.slots.lock();
            self.paused.store(false, Ordering::Release);
        }
        self.wakeup.notify_all();
    }

    /// Returns `true` while delivery is paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Ends the queue. The dispatch loop returns and async sends fail.
    pub fn end(&self) {
        if !self.ended.swap(true, Ordering::AcqRel) {
            #[cfg(feature = "tracing")]
            tracing::debug!("event queue ended");
        }
        self.notify_all();
    }

    /// Returns `true` once [`end`](Self::end) was called.
    pub fn must_end(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    /// Registers the handler for application-bound events.
    pub fn set_app_handler(&self, handler: impl Fn(i32, Event) -> bool + Send + Sync + 'static) {
        *self.handler.lock() = Some(Arc::new(handler));
    }

    /// Removes the application handler.
    pub fn clear_app_handler(&self) {
        *self.handler.lock() = None;
    }

    /// Passes an event to the application handler.
    ///
    /// Returns `false` after [`end`](Self::end), when no handler is
    /// registered, or when the handler itself declines the event.
    pub fn call_async_handler(&self, src_node_id: i32, event: Event) -> bool {
        if self.must_end() {
            return false;
        }
        self.call_sync_handler(src_node_id, event)
    }

    /// Passes an event to the application handler on the calling thread,
    /// even after [`end`](Self::end).
    pub fn call_sync_handler(&self, src_node_id: i32, event: Event) -> bool {
        let handler = self.handler.lock().clone();
        match handler {
            Some(handler) => handler(src_node_id, event),
            None => false,
        }
    }

    /// Dispatch loop: delivers messages until [`end`](Self::end).
    ///
    /// Blocks while the queue is empty or paused.
    pub fn execute(&self) {
        let mut slots = self.slots.lock();
        while !self.must_end() {
            if !self.is_paused()
                && let Some(message) = slots.pop_highest()
            {
                slots.delivering += 1;
                MutexGuard::unlocked(&mut slots, || {
                    self.deliver(message);
                });
                self.delivered(&mut slots);
                continue;
            }
            self.wakeup.wait(&mut slots);
        }
    }

    /// Delivers every queued message without blocking.
    ///
    /// Stops early when the queue is paused or ended. Returns the number of
    /// messages delivered; expired messages are dropped and not counted.
    pub fn execute_pending(&self) -> usize {
        let mut delivered = 0;
        loop {
            let message = {
                let mut slots = self.slots.lock();
                if self.must_end() || self.is_paused() {
                    break;
                }
                let Some(message) = slots.pop_highest() else {
                    break;
                };
                slots.delivering += 1;
                message
            };
            let ok = self.deliver(message);
            self.delivered(&mut self.slots.lock());
            if ok {
                delivered += 1;
            }
        }
        delivered
    }

    fn delivered(&self, slots: &mut Slots) {
        slots.delivering -= 1;
        if slots.delivering == 0 {
            self.idle.notify_all();
        }
    }

    fn deliver(&self, message: Message) -> bool {
        let Message {
            destination,
            event,
            timestamp,
        } = message;

        if let Some(ttl) = event.ttl
            && self.platform.now() > timestamp + ttl
        {
            #[cfg(feature = "tracing")]
            tracing::trace!(event_id = event.event_id, "event expired in queue");
            return false;
        }

        self.platform.set_thread_priority(event.priority);
        let delivered = match destination {
            Destination::Local { node, port } => {
                node.process_event(port, event);
                true
            }
            Destination::Distant { src_node_id } => self.call_async_handler(src_node_id, event),
        };
        self.platform.restore_thread_priority();
        delivered
    }

    fn notify_all(&self) {
        // Taking the lock orders the flag change before a waiter's check.
        let _slots = self.slots.lock();
        self.wakeup.notify_all();
    }
}

/// Thread running an event queue's dispatch loop.
///
/// Dropping the handle ends the queue and joins the thread.
#[derive(Debug)]
pub struct EventThread {
    queue: Arc<EventQueue>,
    handle: Option<JoinHandle<()>>,
}

impl EventThread {
    /// Starts dispatching `queue` on a new thread.
    pub fn spawn(queue: Arc<EventQueue>) -> std::io::Result<Self> {
        let worker = Arc::clone(&queue);
        let handle = std::thread::Builder::new()
            .name("cg-events".into())
            .spawn(move || worker.execute())?;
        Ok(Self {
            queue,
            handle: Some(handle),
        })
    }

    /// Queue served by this thread.
    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    /// Ends the queue and waits for the thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.queue.end();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            #[cfg(feature = "tracing")]
            tracing::error!("event thread panicked");
        }
    }
}

impl Drop for EventThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
