use crate::binding::Target;
use crate::bus::BusRef;
use crate::event::{Event, EventType};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::error;

/// Everything known about a failed delivery.
#[derive(Debug, Clone)]
pub struct SubscriberExceptionContext {
    bus: BusRef,
    event: Arc<dyn Event>,
    target: Target,
    handler: &'static str,
    declared: EventType,
}

impl SubscriberExceptionContext {
    pub(crate) const fn new(
        bus: BusRef,
        event: Arc<dyn Event>,
        target: Target,
        handler: &'static str,
        declared: EventType,
    ) -> Self {
        Self { bus, event, target, handler, declared }
    }

    /// The bus the event was posted on.
    #[must_use]
    pub const fn bus(&self) -> &BusRef {
        &self.bus
    }

    #[must_use]
    pub const fn event(&self) -> &Arc<dyn Event> {
        &self.event
    }

    /// The listener instance whose handler failed.
    #[must_use]
    pub const fn subscriber(&self) -> &Target {
        &self.target
    }

    /// Identity of the failed handler within its listener.
    #[must_use]
    pub const fn handler(&self) -> &'static str {
        self.handler
    }

    /// The event type the handler was bound to.
    #[must_use]
    pub const fn declared_type(&self) -> EventType {
        self.declared
    }
}

/// Receives errors returned by handlers.
///
/// Returning an error (or panicking) from here is tolerated: the bus logs the secondary
/// failure and carries on.
pub trait SubscriberExceptionHandler: Send + Sync {
    /// # Errors
    /// Any error is logged by the bus and otherwise ignored.
    fn handle_exception(
        &self,
        error: &anyhow::Error,
        context: &SubscriberExceptionContext,
    ) -> anyhow::Result<()>;
}

impl<F> SubscriberExceptionHandler for F
where
    F: Fn(&anyhow::Error, &SubscriberExceptionContext) -> anyhow::Result<()> + Send + Sync,
{
    fn handle_exception(
        &self,
        error: &anyhow::Error,
        context: &SubscriberExceptionContext,
    ) -> anyhow::Result<()> {
        self(error, context)
    }
}

/// Default handler: records the failure with full context at error level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

impl SubscriberExceptionHandler for LoggingHandler {
    fn handle_exception(
        &self,
        error: &anyhow::Error,
        context: &SubscriberExceptionContext,
    ) -> anyhow::Result<()> {
        error!(
            bus = context.bus().identifier(),
            handler = context.handler(),
            declared = context.declared_type().name(),
            subscriber = %context.subscriber(),
            event = ?context.event(),
            error = %format!("{error:#}"),
            "Exception thrown by subscriber {}({}) on {} when dispatching event",
            context.handler(),
            context.declared_type(),
            context.subscriber(),
        );
        Ok(())
    }
}

/// The subscriber side of the bus: where failures are reported.
///
/// Subscribers hold this instead of the bus itself, so the bus can own its subscribers without
/// a reference cycle.
pub(crate) struct ExceptionRouter {
    bus: BusRef,
    handler: Arc<dyn SubscriberExceptionHandler>,
}

impl ExceptionRouter {
    pub(crate) fn new(bus: BusRef, handler: Arc<dyn SubscriberExceptionHandler>) -> Self {
        Self { bus, handler }
    }

    pub(crate) const fn bus(&self) -> &BusRef {
        &self.bus
    }

    /// Forwards a handler failure. Never fails and never unwinds.
    pub(crate) fn route(&self, error: &anyhow::Error, context: &SubscriberExceptionContext) {
        let outcome =
            catch_unwind(AssertUnwindSafe(|| self.handler.handle_exception(error, context)));
        match outcome {
            Ok(Ok(())) => {},
            Ok(Err(secondary)) => error!(
                bus = self.bus.identifier(),
                handler = context.handler(),
                "Exception {secondary:#} thrown while handling exception: {error:#}"
            ),
            Err(panic) => error!(
                bus = self.bus.identifier(),
                handler = context.handler(),
                "Exception handler panicked ({}) while handling exception: {error:#}",
                panic_message(panic.as_ref())
            ),
        }
    }
}

impl fmt::Debug for ExceptionRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionRouter").field("bus", &self.bus).finish_non_exhaustive()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
