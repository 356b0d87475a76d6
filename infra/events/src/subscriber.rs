use crate::binding::{Fault, Handler, HandlerBinding, Target, TargetId};
use crate::event::{Event, EventType};
use crate::exception::{ExceptionRouter, SubscriberExceptionContext};
use crate::executor::Executor;
use parking_lot::ReentrantMutex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug)]
enum Invocation {
    Concurrent,
    // Reentrant so a handler can post, on an immediate bus, an event routed back to itself.
    Serialized(ReentrantMutex<()>),
}

/// A registered handler: one handler of one target, bound to an executor and a concurrency
/// policy.
///
/// Two subscribers are equal when they wrap the same handler of the same target instance.
pub struct Subscriber {
    target: Target,
    handler: &'static str,
    event_type: EventType,
    invocation: Invocation,
    executor: Arc<dyn Executor>,
    router: Arc<ExceptionRouter>,
    invoke: Handler,
}

impl Subscriber {
    pub(crate) fn new(
        binding: HandlerBinding,
        executor: &Arc<dyn Executor>,
        router: &Arc<ExceptionRouter>,
    ) -> Self {
        let HandlerBinding { target, handler, event_type, concurrent, executor: own, invoke } =
            binding;
        let invocation = if concurrent {
            Invocation::Concurrent
        } else {
            Invocation::Serialized(ReentrantMutex::new(()))
        };
        Self {
            target,
            handler,
            event_type,
            invocation,
            executor: own.unwrap_or_else(|| Arc::clone(executor)),
            router: Arc::clone(router),
            invoke,
        }
    }

    /// Submits the delivery of `event` to this subscriber's executor.
    ///
    /// Handler errors go to the bus exception handler. Panics propagate to whoever runs the
    /// work: the posting thread for [`DirectExecutor`](crate::DirectExecutor).
    pub fn deliver(self: &Arc<Self>, event: &Arc<dyn Event>) {
        let subscriber = Arc::clone(self);
        let event = Arc::clone(event);
        self.executor.execute(Box::new(move || subscriber.invoke_handler(&event)));
    }

    fn invoke_handler(&self, event: &Arc<dyn Event>) {
        let outcome = match &self.invocation {
            Invocation::Concurrent => (self.invoke)(event.as_ref()),
            Invocation::Serialized(lock) => {
                let _guard = lock.lock();
                (self.invoke)(event.as_ref())
            },
        };

        match outcome {
            Ok(()) => trace!(handler = self.handler, subscriber = %self.target, "Delivered"),
            Err(Fault::Failed(error)) => {
                let context = SubscriberExceptionContext::new(
                    self.router.bus().clone(),
                    Arc::clone(event),
                    self.target.clone(),
                    self.handler,
                    self.event_type,
                );
                self.router.route(&error, &context);
            },
            Err(Fault::Defect(defect)) => panic!("{defect}"),
        }
    }

    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub const fn handler(&self) -> &'static str {
        self.handler
    }

    /// The type this subscriber was registered for.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event_type
    }

    #[must_use]
    pub const fn is_concurrent(&self) -> bool {
        matches!(self.invocation, Invocation::Concurrent)
    }

    pub(crate) fn matches(&self, target: TargetId, handler: &str) -> bool {
        self.target.id() == target && self.handler == handler
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other.target.id(), other.handler)
    }
}

impl Eq for Subscriber {}

impl Hash for Subscriber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.target.id().hash(state);
        self.handler.hash(state);
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("target", &self.target)
            .field("handler", &self.handler)
            .field("event_type", &self.event_type)
            .field("invocation", &self.invocation)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
