use crate::bus::{BusInner, BusRef, EventBus};
use crate::config::{EventBusConfig, normalize_identifier};
use crate::dispatcher::{Dispatcher, PerThreadQueuedDispatcher};
use crate::exception::{ExceptionRouter, LoggingHandler, SubscriberExceptionHandler};
use crate::executor::{DirectExecutor, Executor};
use crate::registry::SubscriberRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Assembles an [`EventBus`].
///
/// Every setting is optional: the defaults are the `"default"` identifier, a
/// [`PerThreadQueuedDispatcher`], a [`DirectExecutor`] and a [`LoggingHandler`].
#[derive(Default)]
pub struct EventBusBuilder {
    identifier: Option<String>,
    executor: Option<Arc<dyn Executor>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    exception_handler: Option<Arc<dyn SubscriberExceptionHandler>>,
}

impl EventBusBuilder {
    #[must_use = "Creates a new event bus builder with default settings"]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "Sets the identifier reported in logs and dead events"]
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use = "Sets the executor handlers run on unless they bring their own"]
    pub fn executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    #[must_use = "Sets the delivery ordering strategy"]
    pub fn dispatcher(mut self, dispatcher: impl Dispatcher + 'static) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    #[must_use = "Sets the handler that receives subscriber failures"]
    pub fn exception_handler(mut self, handler: impl SubscriberExceptionHandler + 'static) -> Self {
        self.exception_handler = Some(Arc::new(handler));
        self
    }

    /// Applies the identifier and dispatch mode of `config`.
    #[must_use = "Applies a declarative configuration"]
    pub fn config(mut self, config: &EventBusConfig) -> Self {
        self.identifier = Some(config.identifier.clone());
        self.dispatcher = Some(config.dispatch.dispatcher());
        self
    }

    #[must_use]
    pub fn build(self) -> EventBus {
        let identifier = normalize_identifier(self.identifier.as_deref().unwrap_or_default());
        let handle = BusRef::new(identifier);
        let executor = self.executor.unwrap_or_else(|| Arc::new(DirectExecutor));
        let dispatcher =
            self.dispatcher.unwrap_or_else(|| Arc::new(PerThreadQueuedDispatcher::new()));
        let handler = self.exception_handler.unwrap_or_else(|| Arc::new(LoggingHandler));

        debug!(bus = %handle, ?executor, ?dispatcher, "Event bus created");

        let router = Arc::new(ExceptionRouter::new(handle.clone(), handler));
        EventBus {
            inner: Arc::new(BusInner {
                handle,
                registry: SubscriberRegistry::new(executor, router),
                dispatcher,
            }),
        }
    }
}

impl fmt::Debug for EventBusBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBusBuilder")
            .field("identifier", &self.identifier)
            .field("executor", &self.executor)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
