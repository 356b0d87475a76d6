use herald_event_bus::Event;

#[derive(Debug, Event)]
pub struct OrderEvent {
    pub order: u64,
}

#[derive(Debug, Event)]
pub struct OrderShipped {
    #[event(base)]
    pub order: OrderEvent,
}

fn main() {}
