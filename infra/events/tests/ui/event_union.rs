use herald_event_bus::Event;

#[derive(Event)]
pub union Raw {
    bits: u32,
    value: f32,
}

fn main() {}
