use crate::error::{EventBusError, EventBusErrorExt};
use crate::exception::panic_message;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::runtime::Handle;
use tracing::{dispatcher, error, trace};

/// A unit of delivery work: invoke one handler with one event.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Accepts and runs units of delivery work.
///
/// Bound per bus (see [`EventBusBuilder::executor`](crate::EventBusBuilder::executor)) and
/// optionally per handler (see [`HandlerBinding::executor`](crate::HandlerBinding::executor)).
pub trait Executor: Send + Sync + fmt::Debug {
    fn execute(&self, work: Work);
}

/// Runs work synchronously on the calling thread.
///
/// With this executor `post` does not return until every handler has run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectExecutor;

impl Executor for DirectExecutor {
    #[inline]
    fn execute(&self, work: Work) {
        work();
    }
}

/// Hands work off to the blocking pool of a Tokio runtime.
///
/// `post` returns as soon as every handler has been scheduled. Handlers are plain
/// synchronous functions, so they run via [`Handle::spawn_blocking`] rather than on the
/// async workers.
///
/// Nobody joins the blocking task, so a handler panic (including a binding defect) is caught
/// and logged at error level instead of unwinding into the runtime. The posting thread's
/// `tracing` dispatcher is carried over to the task.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Binds to the runtime the caller is running on.
    ///
    /// # Errors
    /// Returns [`EventBusError::RuntimeUnavailable`] when called outside a Tokio runtime.
    pub fn current() -> Result<Self, EventBusError> {
        let handle = Handle::try_current().context("TokioExecutor::current")?;
        Ok(Self::new(handle))
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, work: Work) {
        trace!("Handing delivery off to the tokio blocking pool");
        let dispatch = dispatcher::get_default(Clone::clone);
        drop(self.handle.spawn_blocking(move || {
            dispatcher::with_default(&dispatch, || {
                if let Err(panic) = catch_unwind(AssertUnwindSafe(work)) {
                    error!(
                        panic = panic_message(panic.as_ref()),
                        "Delivery panicked on the tokio blocking pool"
                    );
                }
            });
        }));
    }
}
