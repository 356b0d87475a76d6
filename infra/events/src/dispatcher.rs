use crate::event::Event;
use crate::subscriber::Subscriber;
use fxhash::FxHashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, trace};

/// Decides in which order an event and its resolved subscribers are driven.
pub trait Dispatcher: Send + Sync + fmt::Debug {
    fn dispatch(&self, event: Arc<dyn Event>, subscribers: Vec<Arc<Subscriber>>);
}

struct Pending {
    event: Arc<dyn Event>,
    subscribers: Vec<Arc<Subscriber>>,
}

#[derive(Default)]
struct DispatchContext {
    queue: VecDeque<Pending>,
    draining: bool,
}

/// Queues events per posting thread and drains them in FIFO order.
///
/// Every subscriber of one event is reached before the next event starts, so events posted from
/// inside a handler are delivered after the current event is done (breadth-first). This is the
/// default.
#[derive(Default)]
pub struct PerThreadQueuedDispatcher {
    contexts: Mutex<FxHashMap<ThreadId, DispatchContext>>,
}

impl PerThreadQueuedDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self, thread: ThreadId) -> Option<Pending> {
        self.contexts.lock().get_mut(&thread).and_then(|context| context.queue.pop_front())
    }

    /// Number of threads currently draining.
    #[must_use]
    pub fn active_contexts(&self) -> usize {
        self.contexts.lock().len()
    }
}

impl Dispatcher for PerThreadQueuedDispatcher {
    fn dispatch(&self, event: Arc<dyn Event>, subscribers: Vec<Arc<Subscriber>>) {
        let thread = thread::current().id();
        {
            let mut contexts = self.contexts.lock();
            let context = contexts.entry(thread).or_default();
            context.queue.push_back(Pending { event, subscribers });
            if context.draining {
                trace!(queued = context.queue.len(), "Queued nested event");
                return;
            }
            context.draining = true;
        }

        let _guard = DrainGuard { contexts: &self.contexts, thread };
        while let Some(Pending { event, subscribers }) = self.next(thread) {
            for subscriber in &subscribers {
                subscriber.deliver(&event);
            }
        }
    }
}

impl fmt::Debug for PerThreadQueuedDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerThreadQueuedDispatcher")
            .field("active_contexts", &self.active_contexts())
            .finish()
    }
}

/// Drops the thread's context once draining stops, including when a handler panics.
struct DrainGuard<'a> {
    contexts: &'a Mutex<FxHashMap<ThreadId, DispatchContext>>,
    thread: ThreadId,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.contexts.lock().remove(&self.thread)
            && !context.queue.is_empty()
        {
            debug!(discarded = context.queue.len(), "Dispatch interrupted, dropping queued events");
        }
    }
}

/// Delivers to each subscriber as soon as the event is posted.
///
/// Events posted from inside a handler are delivered before the remaining subscribers of the
/// outer event (depth-first).
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateDispatcher;

impl Dispatcher for ImmediateDispatcher {
    fn dispatch(&self, event: Arc<dyn Event>, subscribers: Vec<Arc<Subscriber>>) {
        for subscriber in &subscribers {
            subscriber.deliver(&event);
        }
    }
}
