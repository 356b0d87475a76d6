use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A routing key: anything subscribers can declare interest in.
///
/// Concrete events, capability markers and [`AnyEvent`] all implement this trait. Capability
/// markers are usually uninhabited enums:
///
/// ```rust
/// use herald_event_bus::EventKind;
///
/// pub enum Auditable {}
/// impl EventKind for Auditable {}
/// ```
pub trait EventKind: 'static {
    /// The direct supertypes (ancestors and capabilities) of this kind.
    ///
    /// The bus walks these transitively, so only the immediate ones need to be listed.
    fn supertypes() -> Vec<EventType>
    where
        Self: Sized,
    {
        Vec::new()
    }
}

/// A value that can be posted on the [`EventBus`](crate::EventBus).
///
/// Usually derived with [`macro@crate::Event`]. Implementations for common standard library
/// value types are provided, so `bus.post(String::from("hello"))` works out of the box.
pub trait Event: EventKind + Any + Send + Sync + fmt::Debug {
    /// Returns this event seen as one of its ancestor types, if it embeds one.
    ///
    /// Typed handlers declared for an ancestor receive the value returned here. Events that
    /// embed a parent should also forward lookups to it so grandparents resolve.
    fn view(&self, _ty: TypeId) -> Option<&dyn Any> {
        None
    }
}

/// The universal supertype. Subscribers bound to it receive every event posted on the bus,
/// which also means the bus never produces a [`DeadEvent`].
#[derive(Debug)]
pub enum AnyEvent {}

impl EventKind for AnyEvent {}

/// Runtime descriptor of an [`EventKind`].
///
/// Equality and hashing only consider the underlying [`TypeId`].
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    supertypes: fn() -> Vec<Self>,
}

impl EventType {
    #[must_use]
    pub fn of<K: EventKind>() -> Self {
        Self { id: TypeId::of::<K>(), name: std::any::type_name::<K>(), supertypes: K::supertypes }
    }

    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The declared direct supertypes.
    #[must_use]
    pub fn supertypes(&self) -> Vec<Self> {
        (self.supertypes)()
    }

    #[must_use]
    pub fn is<K: EventKind>(&self) -> bool {
        self.id == TypeId::of::<K>()
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Views `event` as `E`, either directly or through [`Event::view`].
pub(crate) fn project<E: Event>(event: &dyn Event) -> Option<&E> {
    let any: &dyn Any = event;
    any.downcast_ref::<E>()
        .or_else(|| event.view(TypeId::of::<E>()).and_then(|view| view.downcast_ref::<E>()))
}

macro_rules! impl_value_events {
    ($($ty:ty),* $(,)?) => {
        $(
            impl EventKind for $ty {}
            impl Event for $ty {}
        )*
    };
}

impl_value_events!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    &'static str,
    String,
    std::borrow::Cow<'static, str>,
    std::time::Duration,
);
