#![allow(dead_code)]

use herald_event_bus::{
    AnyEvent, Bindings, DeadEvent, Event, EventBus, EventKind, HandlerResult, Listener,
    SubscriberExceptionContext,
};
use parking_lot::Mutex;
use std::any::Any;
use std::io;
use std::sync::Arc;

/// Capability marker for events that must reach the audit trail.
pub enum Auditable {}
impl EventKind for Auditable {}

#[derive(Debug, Clone, PartialEq, Eq, Event)]
pub struct AccountEvent {
    pub account: u64,
}

#[derive(Debug, Clone, Event)]
#[event(implements(Auditable))]
pub struct AccountOpened {
    #[event(parent)]
    pub base: AccountEvent,
    pub owner: String,
}

#[derive(Debug, Clone, Event)]
pub struct PremiumAccountOpened {
    #[event(parent)]
    pub opened: AccountOpened,
    pub tier: u8,
}

/// Claims to be an `AccountEvent` without embedding one.
#[derive(Debug, Event)]
#[event(implements(AccountEvent))]
pub struct Impostor;

pub fn opened(account: u64, owner: &str) -> AccountOpened {
    AccountOpened { base: AccountEvent { account }, owner: owner.to_owned() }
}

/// Collects every `String` posted.
#[derive(Debug, Default)]
pub struct StringCatcher {
    pub events: Mutex<Vec<String>>,
}

impl StringCatcher {
    fn on_string(&self, event: &String) -> HandlerResult {
        self.events.lock().push(event.clone());
        Ok(())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl Listener for StringCatcher {
    fn bindings(bindings: &mut Bindings<'_, Self>) {
        bindings.on("on_string", Self::on_string);
    }
}

/// Collects every [`DeadEvent`].
#[derive(Debug, Default)]
pub struct DeadEventCatcher {
    pub events: Mutex<Vec<DeadEvent>>,
}

impl DeadEventCatcher {
    fn on_dead(&self, event: &DeadEvent) -> HandlerResult {
        self.events.lock().push(event.clone());
        Ok(())
    }

    pub fn events(&self) -> Vec<DeadEvent> {
        self.events.lock().clone()
    }
}

impl Listener for DeadEventCatcher {
    fn bindings(bindings: &mut Bindings<'_, Self>) {
        bindings.on("on_dead", Self::on_dead);
    }
}

/// Sees every event regardless of type.
#[derive(Debug, Default)]
pub struct Wiretap {
    pub seen: Mutex<Vec<String>>,
}

impl Listener for Wiretap {
    fn bindings(bindings: &mut Bindings<'_, Self>) {
        bindings.on_kind::<AnyEvent, _>("on_any", |tap, event| {
            tap.seen.lock().push(format!("{event:?}"));
            Ok(())
        });
    }
}

/// Records which of its handlers saw an account event, in delivery order.
#[derive(Debug, Default)]
pub struct AccountAudit {
    pub trail: Mutex<Vec<String>>,
}

impl AccountAudit {
    fn on_premium(&self, event: &PremiumAccountOpened) -> HandlerResult {
        self.trail.lock().push(format!("premium:{}", event.tier));
        Ok(())
    }

    fn on_opened(&self, event: &AccountOpened) -> HandlerResult {
        self.trail.lock().push(format!("opened:{}", event.owner));
        Ok(())
    }

    fn on_account(&self, event: &AccountEvent) -> HandlerResult {
        self.trail.lock().push(format!("account:{}", event.account));
        Ok(())
    }

    fn on_auditable(&self, _event: &dyn Event) -> HandlerResult {
        self.trail.lock().push("auditable".to_owned());
        Ok(())
    }

    pub fn trail(&self) -> Vec<String> {
        self.trail.lock().clone()
    }
}

impl Listener for AccountAudit {
    fn bindings(bindings: &mut Bindings<'_, Self>) {
        bindings.on("on_premium", Self::on_premium);
        bindings.on("on_opened", Self::on_opened);
        bindings.on("on_account", Self::on_account);
        bindings.on_kind::<Auditable, _>("on_auditable", Self::on_auditable);
        bindings.on_kind::<AnyEvent, _>("on_any", |audit, _| {
            audit.trail.lock().push("any".to_owned());
            Ok(())
        });
    }
}

/// Always fails on strings.
#[derive(Debug, Default)]
pub struct Flaky;

impl Listener for Flaky {
    fn bindings(bindings: &mut Bindings<'_, Self>) {
        bindings.on("on_string", |_: &Self, text: &String| Err(anyhow::anyhow!("boom: {text}")));
    }
}

/// Posts a follow-up event from inside a handler and journals every delivery.
#[derive(Debug)]
pub struct Reposter {
    pub bus: EventBus,
    pub journal: Mutex<Vec<String>>,
}

impl Reposter {
    pub fn new(bus: &EventBus) -> Self {
        Self { bus: bus.clone(), journal: Mutex::new(Vec::new()) }
    }

    fn on_text(&self, text: &String) -> HandlerResult {
        self.journal.lock().push(format!("first:{text}"));
        if text == "outer" {
            self.bus.post(1_u32);
        }
        Ok(())
    }

    fn on_text_again(&self, text: &String) -> HandlerResult {
        self.journal.lock().push(format!("second:{text}"));
        Ok(())
    }

    fn on_number(&self, number: &u32) -> HandlerResult {
        self.journal.lock().push(format!("number:{number}"));
        Ok(())
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().clone()
    }
}

impl Listener for Reposter {
    fn bindings(bindings: &mut Bindings<'_, Self>) {
        bindings.on("on_text", Self::on_text);
        bindings.on("on_text_again", Self::on_text_again);
        bindings.on("on_number", Self::on_number);
    }
}

/// What an exception handler observed about one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub error: String,
    pub bus: String,
    pub handler: &'static str,
    pub listener: &'static str,
    pub event: Option<String>,
}

impl Failure {
    pub fn from_context(error: &anyhow::Error, context: &SubscriberExceptionContext) -> Self {
        Self {
            error: error.to_string(),
            bus: context.bus().identifier().to_owned(),
            handler: context.handler(),
            listener: context.subscriber().type_name(),
            event: (&**context.event() as &dyn Any).downcast_ref::<String>().cloned(),
        }
    }
}

/// In-memory log sink for `tracing_subscriber::fmt`.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `f` with a scoped fmt subscriber writing into the returned buffer.
pub fn with_captured_logs(f: impl FnOnce()) -> CapturedLogs {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::TRACE)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    logs
}
