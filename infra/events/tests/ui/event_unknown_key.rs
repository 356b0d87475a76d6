use herald_event_bus::Event;

#[derive(Debug, Event)]
#[event(extends(String))]
pub struct OrderEvent {
    pub order: u64,
}

fn main() {}
