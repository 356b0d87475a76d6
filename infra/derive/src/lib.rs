#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the Herald workspace.
//! This crate provides the error attribute shared by every infrastructure crate and the
//! `Event` derive used to declare how an event type is routed through the bus.
//!
//! ## Usage
//! The event bus re-exports [`macro@Event`], so most consumers never depend on this crate directly:
//! ```toml
//! [dependencies]
//! herald-event-bus = { path = "../infra/events" }
//! ```
//!
//! See each macro’s docstring for examples; they are `ignore`d to avoid compiling in this crate,
//! but should be copied into consuming crates’ tests/examples as needed.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// A high-level attribute macro for defining domain-specific error enums.
///
/// This macro reduces boilerplate by transforming a standard enum into a fully-featured
/// error type integrated with the Herald infrastructure.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]`.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: Implements `From<T>` for variants containing a `#[source]` field,
///   enabling the use of the `?` operator for upstream errors.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum**.
/// 2. Variants that support context must include a `context: Option<Cow<'static, str>>` field.
/// 3. Variants wrapping external errors must include a `source: T` field or a field marked
///    with `#[source]`/`#[from]` (compatible with `thiserror`).
/// 4. Tuple or unit variants are rejected to keep error wiring explicit and reliable.
///
/// # Example
///
/// ```rust,ignore
/// use herald_derive::herald_error;
/// use std::borrow::Cow;
///
/// #[herald_error]
/// pub enum EventBusError {
///     #[error("Runtime unavailable{}: {source}", format_context(.context))]
///     RuntimeUnavailable {
///         #[source]
///         source: tokio::runtime::TryCurrentError,
///         context: Option<Cow<'static, str>>,
///     },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn handle() -> Result<tokio::runtime::Handle, EventBusError> {
///     tokio::runtime::Handle::try_current().context("Binding executor")
/// }
/// ```
#[proc_macro_attribute]
pub fn herald_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}

/// Derives `EventKind` and `Event` for a struct or enum.
///
/// The derived type always routes to its own subscribers first, then to every declared
/// supertype (transitively), and finally to `AnyEvent` subscribers.
///
/// # Attributes
///
/// * `#[event(implements(A, B))]` on the type: declares capability markers (or any other
///   `EventKind`) this event satisfies. Handlers for these kinds receive `&dyn Event`.
/// * `#[event(parent)]` on a field: the field's type becomes a supertype and typed handlers for
///   it receive a reference to that field. Views are resolved through the parent as well, so
///   grandparent handlers keep working.
///
/// # Example
///
/// ```rust,ignore
/// use herald_event_bus::{Event, EventKind};
///
/// pub enum Auditable {}
/// impl EventKind for Auditable {}
///
/// #[derive(Debug, Event)]
/// pub struct AccountEvent { pub account: u64 }
///
/// #[derive(Debug, Event)]
/// #[event(implements(Auditable))]
/// pub struct AccountClosed {
///     #[event(parent)]
///     pub base: AccountEvent,
///     pub reason: String,
/// }
/// ```
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::event::expand_derive(input).into()
}
