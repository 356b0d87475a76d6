use herald_event_bus::{AnyEvent, Event, EventKind, EventType};
use std::any::TypeId;

pub enum Billable {}
impl EventKind for Billable {}

#[derive(Debug, Event)]
pub struct OrderEvent {
    pub order: u64,
}

#[derive(Debug, Event)]
#[event(implements(Billable))]
pub struct OrderShipped(#[event(parent)] pub OrderEvent, pub String);

#[derive(Debug, Event)]
pub enum Signal {
    Start,
    Stop { code: i32 },
}

#[derive(Debug, Event)]
pub struct Envelope<T: Send + Sync + std::fmt::Debug + 'static> {
    pub payload: T,
}

fn main() {
    assert_eq!(
        EventType::of::<OrderShipped>().supertypes(),
        [EventType::of::<OrderEvent>(), EventType::of::<Billable>()]
    );
    assert!(!EventType::of::<OrderShipped>().is::<AnyEvent>());

    let shipped = OrderShipped(OrderEvent { order: 3 }, "dock".into());
    let parent = shipped.view(TypeId::of::<OrderEvent>()).and_then(|v| v.downcast_ref::<OrderEvent>());
    assert_eq!(parent.map(|p| p.order), Some(3));

    assert!(Signal::Stop { code: 1 }.view(TypeId::of::<OrderEvent>()).is_none());
    assert!(Signal::supertypes().is_empty());
    assert!(Envelope::<u8>::supertypes().is_empty());
}
