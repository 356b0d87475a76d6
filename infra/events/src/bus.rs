use crate::binding::{Bindings, Listener, TargetId};
use crate::builder::EventBusBuilder;
use crate::config::EventBusConfig;
use crate::dispatcher::Dispatcher;
use crate::error::EventBusError;
use crate::event::{Event, EventKind, EventType, project};
use crate::registry::SubscriberRegistry;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

static NEXT_BUS_ID: AtomicU64 = AtomicU64::new(1);

/// A lightweight reference to a bus: its identifier plus a process-unique id.
///
/// Carried by [`DeadEvent`]s and exception contexts. Holding one does not keep the bus alive.
#[derive(Clone)]
pub struct BusRef {
    id: u64,
    identifier: Arc<str>,
}

impl BusRef {
    pub(crate) fn new(identifier: impl Into<Arc<str>>) -> Self {
        Self { id: NEXT_BUS_ID.fetch_add(1, Ordering::Relaxed), identifier: identifier.into() }
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Whether this reference points at `bus`.
    #[must_use]
    pub fn is(&self, bus: &EventBus) -> bool {
        self.id == bus.inner.handle.id
    }
}

impl PartialEq for BusRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BusRef {}

impl Hash for BusRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for BusRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus{{{}}}#{}", self.identifier, self.id)
    }
}

impl fmt::Display for BusRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus{{{}}}", self.identifier)
    }
}

/// Wraps an event that was posted but had no subscribers.
///
/// Subscribe to `DeadEvent` to find events that went nowhere, usually a missing registration.
/// A `DeadEvent` that itself finds no subscriber is dropped.
#[derive(Debug, Clone)]
pub struct DeadEvent {
    source: BusRef,
    event: Arc<dyn Event>,
    event_type: EventType,
}

impl DeadEvent {
    /// The bus the event was posted on.
    #[must_use]
    pub const fn source(&self) -> &BusRef {
        &self.source
    }

    #[must_use]
    pub const fn event(&self) -> &Arc<dyn Event> {
        &self.event
    }

    /// Runtime type of the wrapped event.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The wrapped event as `E`, if it is one (or has an `E` view).
    #[must_use]
    pub fn downcast_ref<E: Event>(&self) -> Option<&E> {
        project::<E>(self.event.as_ref())
    }
}

impl fmt::Display for DeadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeadEvent{{source={}, event={:?}}}", self.source, self.event)
    }
}

impl EventKind for DeadEvent {}
impl Event for DeadEvent {}

pub(crate) struct BusInner {
    pub(crate) handle: BusRef,
    pub(crate) registry: SubscriberRegistry,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
}

/// Routes posted events to registered listeners.
///
/// Cloning is cheap; clones share registrations.
///
/// ```rust
/// use herald_event_bus::{Bindings, DeadEvent, EventBus, HandlerResult, Listener};
/// use parking_lot::Mutex;
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Lost(Mutex<Vec<String>>);
///
/// impl Lost {
///     fn on_dead(&self, dead: &DeadEvent) -> HandlerResult {
///         self.0.lock().push(format!("{:?}", dead.event()));
///         Ok(())
///     }
/// }
///
/// impl Listener for Lost {
///     fn bindings(bindings: &mut Bindings<'_, Self>) {
///         bindings.on("on_dead", Self::on_dead);
///     }
/// }
///
/// let bus = EventBus::with_identifier("orders");
/// let lost = Arc::new(Lost::default());
/// bus.register(&lost);
/// bus.post(42_i32);
/// assert_eq!(*lost.0.lock(), ["42"]);
/// ```
#[derive(Clone)]
pub struct EventBus {
    pub(crate) inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// A bus named `"default"` with queued dispatch and synchronous delivery.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn with_identifier(identifier: impl Into<String>) -> Self {
        Self::builder().identifier(identifier).build()
    }

    #[must_use]
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    #[must_use]
    pub fn from_config(config: &EventBusConfig) -> Self {
        Self::builder().config(config).build()
    }

    #[must_use]
    pub fn identifier(&self) -> &str {
        self.inner.handle.identifier()
    }

    /// A reference to this bus that can be stored without keeping it alive.
    #[must_use]
    pub fn handle(&self) -> BusRef {
        self.inner.handle.clone()
    }

    /// Registers every handler `listener` declares.
    ///
    /// Handlers already registered for this instance are left untouched.
    pub fn register<L: Listener>(&self, listener: &Arc<L>) {
        let added = self.inner.registry.register(Bindings::collect(listener));
        trace!(
            bus = self.identifier(),
            added,
            listener = std::any::type_name::<L>(),
            "Registered"
        );
    }

    /// Removes every handler `listener` declares.
    ///
    /// # Errors
    /// Returns [`EventBusError::NotRegistered`] if the instance is not registered for one of
    /// its declared types. In that case nothing is removed.
    pub fn unregister<L: Listener>(&self, listener: &Arc<L>) -> Result<(), EventBusError> {
        let bindings = Bindings::collect(listener);
        let removed = self.inner.registry.unregister(TargetId::of(listener), &bindings)?;
        trace!(
            bus = self.identifier(),
            removed,
            listener = std::any::type_name::<L>(),
            "Unregistered"
        );
        Ok(())
    }

    /// Posts `event` to every subscriber of its type closure.
    ///
    /// Handler failures never surface here. With the default executor every handler has run
    /// by the time this returns.
    pub fn post<E: Event>(&self, event: E) {
        self.post_arc(Arc::new(event));
    }

    /// Posts an event that is already shared, without copying it.
    pub fn post_arc<E: Event>(&self, event: Arc<E>) {
        self.route(event, EventType::of::<E>());
    }

    fn route(&self, event: Arc<dyn Event>, event_type: EventType) {
        let subscribers = self.inner.registry.resolve(event_type);

        if !subscribers.is_empty() {
            trace!(
                bus = self.identifier(),
                event = %event_type,
                subscribers = subscribers.len(),
                "Dispatching"
            );
            self.inner.dispatcher.dispatch(event, subscribers);
        } else if event_type.is::<DeadEvent>() {
            trace!(bus = self.identifier(), "Dropping unobserved dead event");
        } else {
            debug!(
                bus = self.identifier(),
                event = %event_type,
                "No subscribers, posting DeadEvent"
            );
            self.post(DeadEvent { source: self.handle(), event, event_type });
        }
    }

    /// Number of registered subscribers across all event types.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Number of subscribers registered directly for `K`.
    #[must_use]
    pub fn subscribers_for<K: EventKind>(&self) -> usize {
        self.inner.registry.subscribers_for(EventType::of::<K>())
    }
}

impl fmt::Display for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner.handle, f)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("identifier", &self.identifier())
            .field("registry", &self.inner.registry)
            .field("dispatcher", &self.inner.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_and_display() {
        assert_eq!(EventBus::new().identifier(), "default");
        let bus = EventBus::with_identifier("orders");
        assert_eq!(bus.to_string(), "EventBus{orders}");
        assert_eq!(bus.handle().to_string(), "EventBus{orders}");
    }

    #[test]
    fn handles_compare_by_bus() {
        let a = EventBus::with_identifier("same");
        let b = EventBus::with_identifier("same");
        assert_eq!(a.handle(), a.clone().handle());
        assert_ne!(a.handle(), b.handle());
        assert!(a.handle().is(&a));
        assert!(!a.handle().is(&b));
    }

    #[test]
    fn dead_event_exposes_the_wrapped_value() {
        let dead = DeadEvent {
            source: BusRef::new("x"),
            event: Arc::new(42_i32),
            event_type: EventType::of::<i32>(),
        };
        assert_eq!(dead.downcast_ref::<i32>(), Some(&42));
        assert!(dead.downcast_ref::<u32>().is_none());
        assert!(dead.event_type().is::<i32>());
        assert_eq!(dead.to_string(), "DeadEvent{source=EventBus{x}, event=42}");
    }

    #[test]
    fn unobserved_events_do_not_recurse() {
        let bus = EventBus::new();
        bus.post("nobody listens");
        assert_eq!(bus.subscriber_count(), 0);
    }
}
