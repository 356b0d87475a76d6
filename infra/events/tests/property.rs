pub mod fixtures;

use fixtures::*;
use herald_event_bus::*;
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
enum Op {
    Register(usize),
    Unregister(usize),
}

fn op(listeners: usize) -> impl Strategy<Value = Op> {
    prop_oneof![(0..listeners).prop_map(Op::Register), (0..listeners).prop_map(Op::Unregister)]
}

proptest! {
    #[test]
    fn registry_matches_a_set_model(ops in proptest::collection::vec(op(4), 0..64)) {
        let bus = EventBus::new();
        let listeners: Vec<Arc<AccountAudit>> =
            (0..4).map(|_| Arc::new(AccountAudit::default())).collect();
        let mut registered = [false; 4];

        for op in ops {
            match op {
                Op::Register(i) => {
                    bus.register(&listeners[i]);
                    registered[i] = true;
                },
                Op::Unregister(i) => {
                    let result = bus.unregister(&listeners[i]);
                    prop_assert_eq!(result.is_ok(), registered[i]);
                    registered[i] = false;
                },
            }
            let live = registered.iter().filter(|r| **r).count();
            prop_assert_eq!(bus.subscriber_count(), live * 5);
            prop_assert_eq!(bus.subscribers_for::<AccountEvent>(), live);
        }
    }

    #[test]
    fn delivery_preserves_post_order(events in proptest::collection::vec(".{0,12}", 0..32)) {
        let bus = EventBus::new();
        let strings = Arc::new(StringCatcher::default());
        bus.register(&strings);

        for event in &events {
            bus.post(event.clone());
        }

        prop_assert_eq!(strings.events(), events);
    }

    #[test]
    fn every_unobserved_event_dies_exactly_once(values in proptest::collection::vec(any::<i64>(), 0..32)) {
        let bus = EventBus::new();
        let dead = Arc::new(DeadEventCatcher::default());
        bus.register(&dead);

        for value in &values {
            bus.post(*value);
        }

        let unwrapped: Vec<i64> =
            dead.events().iter().filter_map(|d| d.downcast_ref::<i64>().copied()).collect();
        prop_assert_eq!(unwrapped, values);
    }
}
