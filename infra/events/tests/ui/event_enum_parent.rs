use herald_event_bus::Event;

#[derive(Debug, Event)]
pub struct OrderEvent {
    pub order: u64,
}

#[derive(Debug, Event)]
pub enum OrderChanged {
    Shipped(#[event(parent)] OrderEvent),
}

fn main() {}
