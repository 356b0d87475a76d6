use crate::binding::{HandlerBinding, TargetId};
use crate::error::EventBusError;
use crate::event::{AnyEvent, EventType};
use crate::exception::ExceptionRouter;
use crate::executor::Executor;
use crate::subscriber::Subscriber;
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace, warn};

type SubscriberList = Arc<[Arc<Subscriber>]>;

/// Maps event types to the subscribers registered for them.
///
/// Lists are copy-on-write: `resolve` clones `Arc`s under a short read lock and delivery never
/// holds a registry lock.
pub(crate) struct SubscriberRegistry {
    subscribers: RwLock<FxHashMap<TypeId, SubscriberList>>,
    closures: RwLock<FxHashMap<TypeId, Arc<[EventType]>>>,
    executor: Arc<dyn Executor>,
    router: Arc<ExceptionRouter>,
}

impl SubscriberRegistry {
    pub(crate) fn new(executor: Arc<dyn Executor>, router: Arc<ExceptionRouter>) -> Self {
        Self {
            subscribers: RwLock::new(FxHashMap::default()),
            closures: RwLock::new(FxHashMap::default()),
            executor,
            router,
        }
    }

    /// Adds a subscriber per binding, in order. Returns how many were actually added.
    pub(crate) fn register(&self, bindings: Vec<HandlerBinding>) -> usize {
        let mut map = self.subscribers.write();
        let mut declared = FxHashSet::default();
        let mut added = 0;

        for binding in bindings {
            let id = binding.event_type.id();
            if !declared.insert((id, binding.handler)) {
                warn!(
                    handler = binding.handler,
                    subscriber = %binding.target,
                    event = %binding.event_type,
                    "Handler name declared twice for the same event type, ignoring the second"
                );
                continue;
            }

            let current = map.get(&id).cloned();
            let duplicate = current.as_deref().is_some_and(|list| {
                list.iter().any(|s| s.matches(binding.target.id(), binding.handler))
            });
            if duplicate {
                trace!(
                    handler = binding.handler,
                    subscriber = %binding.target,
                    "Already registered, skipping"
                );
                continue;
            }

            trace!(
                handler = binding.handler,
                subscriber = %binding.target,
                event = %binding.event_type,
                "Registering subscriber"
            );
            let subscriber = Arc::new(Subscriber::new(binding, &self.executor, &self.router));
            let list: SubscriberList = match current {
                Some(list) => list.iter().cloned().chain(std::iter::once(subscriber)).collect(),
                None => Arc::from([subscriber]),
            };
            map.insert(id, list);
            added += 1;
        }

        added
    }

    /// Removes every subscriber of `target` named by `bindings`.
    ///
    /// Nothing is removed unless every declared type still holds at least one of them.
    pub(crate) fn unregister(
        &self,
        target: TargetId,
        bindings: &[HandlerBinding],
    ) -> Result<usize, EventBusError> {
        let mut by_type: FxHashMap<TypeId, (EventType, Vec<&'static str>)> =
            FxHashMap::default();
        for binding in bindings {
            by_type
                .entry(binding.event_type.id())
                .or_insert_with(|| (binding.event_type, Vec::new()))
                .1
                .push(binding.handler);
        }

        let mut map = self.subscribers.write();

        for (id, (event_type, handlers)) in &by_type {
            let present = map.get(id).is_some_and(|list| {
                list.iter().any(|s| handlers.iter().any(|handler| s.matches(target, handler)))
            });
            if !present {
                let listener = bindings.first().map_or("listener", |b| b.target.type_name());
                return Err(EventBusError::NotRegistered {
                    message: format!("{listener} has no subscriber registered for {event_type}")
                        .into(),
                    context: Some("SubscriberRegistry::unregister".into()),
                });
            }
        }

        let mut removed = 0;
        for (id, (_, handlers)) in by_type {
            let Some(list) = map.get(&id) else { continue };
            let kept: Vec<Arc<Subscriber>> = list
                .iter()
                .filter(|s| !handlers.iter().any(|handler| s.matches(target, handler)))
                .cloned()
                .collect();
            removed += list.len() - kept.len();
            if kept.is_empty() {
                map.remove(&id);
            } else {
                map.insert(id, kept.into());
            }
        }

        trace!(removed, "Unregistered subscribers");
        Ok(removed)
    }

    /// Every subscriber interested in `event_type`, most specific type first.
    pub(crate) fn resolve(&self, event_type: EventType) -> Vec<Arc<Subscriber>> {
        let closure = self.type_closure(event_type);
        let map = self.subscribers.read();
        closure
            .iter()
            .filter_map(|ty| map.get(&ty.id()))
            .flat_map(|list| list.iter().cloned())
            .collect()
    }

    /// The memoised type closure of `event_type`.
    pub(crate) fn type_closure(&self, event_type: EventType) -> Arc<[EventType]> {
        if let Some(closure) = self.closures.read().get(&event_type.id()) {
            return Arc::clone(closure);
        }

        let closure: Arc<[EventType]> = flatten_hierarchy(event_type).into();
        debug!(event = %event_type, types = closure.len(), "Cached type closure");
        Arc::clone(self.closures.write().entry(event_type.id()).or_insert(closure))
    }

    /// Total number of subscribers across all types.
    pub(crate) fn len(&self) -> usize {
        self.subscribers.read().values().map(|list| list.len()).sum()
    }

    /// Number of subscribers registered directly for `event_type`.
    pub(crate) fn subscribers_for(&self, event_type: EventType) -> usize {
        self.subscribers.read().get(&event_type.id()).map_or(0, |list| list.len())
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("types", &self.subscribers.read().len())
            .field("subscribers", &self.len())
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

/// Breadth-first walk over declared supertypes, ending with [`AnyEvent`].
fn flatten_hierarchy(event_type: EventType) -> Vec<EventType> {
    let any = EventType::of::<AnyEvent>();
    let mut seen = FxHashSet::default();
    seen.insert(any.id());

    let mut closure = Vec::new();
    let mut pending = VecDeque::new();
    if seen.insert(event_type.id()) {
        pending.push_back(event_type);
    }

    while let Some(ty) = pending.pop_front() {
        closure.push(ty);
        for parent in ty.supertypes() {
            if seen.insert(parent.id()) {
                pending.push_back(parent);
            }
        }
    }

    closure.push(any);
    closure
}
