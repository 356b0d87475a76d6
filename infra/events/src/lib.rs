//! # Event Bus
//!
//! An in-process publish/subscribe dispatcher with type-hierarchy routing.
//!
//! ## Overview
//!
//! Producers post events on an [`EventBus`] without knowing who listens. Listeners declare
//! their handlers through the [`Listener`] trait and receive every event whose *type closure*
//! (its own type, the ancestors it embeds, the capabilities it implements and finally
//! [`AnyEvent`]) contains the type they asked for.
//!
//! ## Features
//!
//! * **Hierarchy routing**: `#[derive(Event)]` declares parents and capabilities.
//! * **Ordering strategies**: per-thread queued (breadth-first) or immediate (depth-first).
//! * **Per-subscriber serialization**: handlers run one at a time unless marked concurrent.
//! * **Dead events**: events nobody listens to are reposted as [`DeadEvent`].
//! * **Isolation**: handler errors go to a [`SubscriberExceptionHandler`], never to the poster.
//! * **Pluggable execution**: run handlers inline or on the Tokio blocking pool.
//!
//! # Example
//!
//! ```rust
//! use herald_event_bus::{AnyEvent, Bindings, Event, EventBus, HandlerResult, Listener};
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Event)]
//! struct AccountEvent { id: u64 }
//!
//! #[derive(Debug, Event)]
//! struct AccountOpened {
//!     #[event(parent)]
//!     account: AccountEvent,
//!     owner: String,
//! }
//!
//! #[derive(Default)]
//! struct Audit(Mutex<Vec<String>>);
//!
//! impl Audit {
//!     fn on_account(&self, event: &AccountEvent) -> HandlerResult {
//!         self.0.lock().push(format!("account {}", event.id));
//!         Ok(())
//!     }
//! }
//!
//! impl Listener for Audit {
//!     fn bindings(bindings: &mut Bindings<'_, Self>) {
//!         bindings.on("on_account", Self::on_account);
//!         bindings.on_kind::<AnyEvent, _>("on_any", |audit, event| {
//!             audit.0.lock().push(format!("{event:?}"));
//!             Ok(())
//!         });
//!     }
//! }
//!
//! let bus = EventBus::new();
//! let audit = Arc::new(Audit::default());
//! bus.register(&audit);
//!
//! bus.post(AccountOpened { account: AccountEvent { id: 7 }, owner: "ada".into() });
//!
//! let log = audit.0.lock();
//! assert_eq!(log[0], "account 7");
//! assert!(log[1].starts_with("AccountOpened"));
//! ```

mod binding;
mod builder;
mod bus;
mod config;
mod dispatcher;
mod error;
mod event;
mod exception;
mod executor;
mod registry;
mod subscriber;

pub use binding::{Bindings, HandlerBinding, HandlerResult, Listener, Target, TargetId};
pub use builder::EventBusBuilder;
pub use bus::{BusRef, DeadEvent, EventBus};
pub use config::{DispatchMode, ENV_PREFIX, EventBusConfig};
pub use dispatcher::{Dispatcher, ImmediateDispatcher, PerThreadQueuedDispatcher};
pub use error::{EventBusError, EventBusErrorExt};
pub use event::{AnyEvent, Event, EventKind, EventType};
pub use exception::{LoggingHandler, SubscriberExceptionContext, SubscriberExceptionHandler};
pub use executor::{DirectExecutor, Executor, TokioExecutor, Work};
pub use herald_derive::Event;
pub use subscriber::Subscriber;
