use crate::dispatcher::{Dispatcher, ImmediateDispatcher, PerThreadQueuedDispatcher};
use crate::error::{EventBusError, EventBusErrorExt};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Prefix of environment overrides, e.g. `HERALD__DISPATCH=immediate`.
pub const ENV_PREFIX: &str = "HERALD";

pub(crate) const DEFAULT_IDENTIFIER: &str = "default";

/// Delivery ordering of a bus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Per-thread queue, breadth-first for nested posts.
    #[default]
    Queued,
    /// Direct delivery, depth-first for nested posts.
    Immediate,
}

impl DispatchMode {
    #[must_use]
    pub fn dispatcher(self) -> Arc<dyn Dispatcher> {
        match self {
            Self::Queued => Arc::new(PerThreadQueuedDispatcher::new()),
            Self::Immediate => Arc::new(ImmediateDispatcher),
        }
    }
}

/// Declarative bus settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    pub identifier: String,
    pub dispatch: DispatchMode,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self { identifier: DEFAULT_IDENTIFIER.to_owned(), dispatch: DispatchMode::default() }
    }
}

impl EventBusConfig {
    /// Reads settings from `path` (format chosen by extension), then applies `HERALD__*`
    /// environment overrides.
    ///
    /// # Errors
    /// Returns [`EventBusError::Config`] if the file is missing or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EventBusError> {
        let path = path.as_ref();
        debug!("Loading event bus config from {}", path.display());

        Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .convert_case(config::Case::Snake),
            )
            .build()
            .context("Failed to build config")?
            .try_deserialize::<Self>()
            .context("Failed to deserialize config")
    }

    /// The identifier actually used by a bus: blank values fall back to `"default"`.
    #[must_use]
    pub fn effective_identifier(&self) -> &str {
        normalize_identifier(&self.identifier)
    }
}

pub(crate) fn normalize_identifier(identifier: &str) -> &str {
    let trimmed = identifier.trim();
    if trimmed.is_empty() { DEFAULT_IDENTIFIER } else { trimmed }
}
