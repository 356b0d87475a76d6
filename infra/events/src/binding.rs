use crate::error::EventBusError;
use crate::event::{Event, EventKind, EventType, project};
use crate::executor::Executor;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// What a handler returns. Errors are routed to the bus exception handler.
pub type HandlerResult = anyhow::Result<()>;

pub(crate) type Handler = Arc<dyn Fn(&dyn Event) -> Result<(), Fault> + Send + Sync>;

/// Why an invocation did not complete.
#[derive(Debug)]
pub(crate) enum Fault {
    /// The handler ran and returned an error.
    Failed(anyhow::Error),
    /// The handler could not be given the event as its declared argument type.
    Defect(EventBusError),
}

/// An object that owns event handlers.
///
/// This is the discovery boundary: instead of scanning for annotated methods, a listener lists
/// its handlers explicitly. The same list is used to register and to unregister.
///
/// ```rust
/// use herald_event_bus::{Bindings, EventBus, HandlerResult, Listener};
/// use parking_lot::Mutex;
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Collector(Mutex<Vec<String>>);
///
/// impl Collector {
///     fn on_text(&self, text: &String) -> HandlerResult {
///         self.0.lock().push(text.clone());
///         Ok(())
///     }
/// }
///
/// impl Listener for Collector {
///     fn bindings(bindings: &mut Bindings<'_, Self>) {
///         bindings.on("on_text", Self::on_text);
///     }
/// }
///
/// let bus = EventBus::new();
/// let collector = Arc::new(Collector::default());
/// bus.register(&collector);
/// bus.post(String::from("hello"));
/// assert_eq!(*collector.0.lock(), ["hello"]);
/// ```
pub trait Listener: Send + Sync + Sized + 'static {
    fn bindings(bindings: &mut Bindings<'_, Self>);
}

/// Identity of a registered target: the address of its shared allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    #[must_use]
    pub fn of<L: Send + Sync + 'static>(target: &Arc<L>) -> Self {
        Self(Arc::as_ptr(target).cast::<()>().addr())
    }
}

/// The instance a handler belongs to.
#[derive(Clone)]
pub struct Target {
    id: TargetId,
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
}

impl Target {
    fn new<L: Send + Sync + 'static>(instance: &Arc<L>) -> Self {
        Self {
            id: TargetId::of(instance),
            type_name: std::any::type_name::<L>(),
            instance: Arc::clone(instance) as Arc<dyn Any + Send + Sync>,
        }
    }

    #[must_use]
    pub const fn id(&self) -> TargetId {
        self.id
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Downcasts the target back to its concrete listener type.
    #[must_use]
    pub fn downcast_ref<L: 'static>(&self) -> Option<&L> {
        self.instance.downcast_ref::<L>()
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target").field("id", &self.id).field("type", &self.type_name).finish()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:#x}", self.type_name, self.id.0)
    }
}

/// One handler of one target, as handed to the registry.
pub struct HandlerBinding {
    pub(crate) target: Target,
    pub(crate) handler: &'static str,
    pub(crate) event_type: EventType,
    pub(crate) concurrent: bool,
    pub(crate) executor: Option<Arc<dyn Executor>>,
    pub(crate) invoke: Handler,
}

impl HandlerBinding {
    /// Marks the handler as safe to invoke from several threads at once.
    ///
    /// Without this, deliveries to this handler are serialized.
    pub const fn allow_concurrent(&mut self) -> &mut Self {
        self.concurrent = true;
        self
    }

    /// Overrides the bus executor for this handler only.
    pub fn executor(&mut self, executor: Arc<dyn Executor>) -> &mut Self {
        self.executor = Some(executor);
        self
    }

    #[must_use]
    pub const fn handler(&self) -> &'static str {
        self.handler
    }

    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.event_type
    }

    #[must_use]
    pub const fn is_concurrent(&self) -> bool {
        self.concurrent
    }

    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("target", &self.target)
            .field("handler", &self.handler)
            .field("event_type", &self.event_type)
            .field("concurrent", &self.concurrent)
            .finish_non_exhaustive()
    }
}

/// Collects the [`HandlerBinding`]s of one listener instance.
pub struct Bindings<'a, L> {
    target: &'a Arc<L>,
    bindings: Vec<HandlerBinding>,
}

impl<'a, L: Listener> Bindings<'a, L> {
    pub(crate) const fn new(target: &'a Arc<L>) -> Self {
        Self { target, bindings: Vec::new() }
    }

    /// Lists every binding declared by `L` for `target`.
    pub(crate) fn collect(target: &'a Arc<L>) -> Vec<HandlerBinding> {
        let mut bindings = Self::new(target);
        L::bindings(&mut bindings);
        bindings.bindings
    }

    /// Binds a typed handler.
    ///
    /// The handler receives every event whose type closure contains `E`; events of a subtype are
    /// passed as the view returned by [`Event::view`].
    ///
    /// `handler` identifies the binding within this listener and must be unique per event type.
    /// A repeated name is logged and only the first binding is registered.
    pub fn on<E, F>(&mut self, handler: &'static str, f: F) -> &mut HandlerBinding
    where
        E: Event,
        F: Fn(&L, &E) -> HandlerResult + Send + Sync + 'static,
    {
        let target = Arc::clone(self.target);
        let invoke: Handler = Arc::new(move |event: &dyn Event| {
            let Some(typed) = project::<E>(event) else {
                return Err(Fault::Defect(EventBusError::HandlerDefect {
                    message: format!(
                        "handler '{handler}' expects {} but was given {event:?}",
                        std::any::type_name::<E>()
                    )
                    .into(),
                    context: Some("no view of the event matches the declared type".into()),
                }));
            };
            f(&target, typed).map_err(Fault::Failed)
        });
        self.push(handler, EventType::of::<E>(), invoke)
    }

    /// Binds a handler to a kind that is not itself a concrete event, such as a capability
    /// marker or [`AnyEvent`](crate::AnyEvent). The handler receives the event untyped.
    /// Handler names follow the same uniqueness rule as [`on`](Self::on).
    pub fn on_kind<K, F>(&mut self, handler: &'static str, f: F) -> &mut HandlerBinding
    where
        K: EventKind,
        F: Fn(&L, &dyn Event) -> HandlerResult + Send + Sync + 'static,
    {
        let target = Arc::clone(self.target);
        let invoke: Handler =
            Arc::new(move |event: &dyn Event| f(&target, event).map_err(Fault::Failed));
        self.push(handler, EventType::of::<K>(), invoke)
    }

    fn push(
        &mut self,
        handler: &'static str,
        event_type: EventType,
        invoke: Handler,
    ) -> &mut HandlerBinding {
        self.bindings.push(HandlerBinding {
            target: Target::new(self.target),
            handler,
            event_type,
            concurrent: false,
            executor: None,
            invoke,
        });
        let last = self.bindings.len() - 1;
        &mut self.bindings[last]
    }
}

impl<L> fmt::Debug for Bindings<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bindings").field("bindings", &self.bindings).finish_non_exhaustive()
    }
}
