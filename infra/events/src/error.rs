use std::borrow::Cow;

/// Errors that can occur during event bus operations.
#[herald_derive::herald_error]
pub enum EventBusError {
    /// `unregister` was called for a listener that has no matching registration.
    /// This usually means a double unregister or a listener that was never registered.
    #[error("Listener not registered{}: {message}", format_context(.context))]
    NotRegistered { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A bound handler cannot accept the event it was routed. This is a defect in the
    /// listener's bindings, never a runtime condition, and is raised as a panic.
    #[error("Handler contract violated{}: {message}", format_context(.context))]
    HandlerDefect { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// An asynchronous executor was requested outside a Tokio runtime.
    #[error("Tokio runtime unavailable{}: {source}", format_context(.context))]
    RuntimeUnavailable {
        source: tokio::runtime::TryCurrentError,
        context: Option<Cow<'static, str>>,
    },

    /// The bus configuration could not be loaded or deserialized.
    #[error("Configuration error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}
