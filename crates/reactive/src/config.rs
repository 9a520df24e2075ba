//! Runtime configuration for the reactive core.
//!
//! Configuration is thread-local, matching the single-threaded execution
//! model: every thread driving a UI has its own scheduler, tick queue and
//! configuration. Values can be loaded from the environment or built
//! programmatically and installed with [`set_config`].

use crate::error::ErrorScope;
use core::cell::RefCell;
use core::fmt;
use std::env;
use std::rc::Rc;

/// Threshold after which a watcher re-queued within one flush is treated as a
/// runaway update loop.
pub const MAX_UPDATE_COUNT: usize = 100;

/// Global error handler: `(error, originating scope, info)`.
///
/// Returning an error makes the runtime log both the original error and the
/// handler failure.
pub type ErrorHandler =
    Rc<dyn Fn(&anyhow::Error, Option<&Rc<dyn ErrorScope>>, &str) -> anyhow::Result<()>>;

/// Receives every warning message emitted by the runtime.
pub type WarnHandler = Rc<dyn Fn(&str)>;

/// Runtime configuration.
#[derive(Clone)]
pub struct Config {
    /// Runaway-loop threshold used by the scheduler.
    pub max_update_count: usize,
    /// When `false`, queued watchers flush synchronously instead of on the next tick.
    pub async_flush: bool,
    /// Suppress all warnings.
    pub silent: bool,
    /// Handler invoked for errors no `error_captured` hook stopped.
    pub error_handler: Option<ErrorHandler>,
    /// Handler invoked for every warning in addition to the log.
    pub warn_handler: Option<WarnHandler>,
    /// Tags the patch engine must not report as unknown elements.
    pub ignored_elements: Vec<String>,
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        Self {
            max_update_count: MAX_UPDATE_COUNT,
            async_flush: true,
            silent: false,
            error_handler: None,
            warn_handler: None,
            ignored_elements: Vec::new(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Config")
            .field("max_update_count", &self.max_update_count)
            .field("async_flush", &self.async_flush)
            .field("silent", &self.silent)
            .field("error_handler", &self.error_handler.is_some())
            .field("warn_handler", &self.warn_handler.is_some())
            .field("ignored_elements", &self.ignored_elements)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `RIPPLE_MAX_UPDATE_COUNT`: runaway-loop threshold (default: 100)
    /// - `RIPPLE_ASYNC`: set to "0" to flush watchers synchronously
    /// - `RIPPLE_SILENT`: set to "1" to suppress warnings
    ///
    /// # Returns
    ///
    /// A new `Config` populated from the environment; handlers are left unset.
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        let max_update_count = env::var("RIPPLE_MAX_UPDATE_COUNT")
            .ok()
            .and_then(|val| val.parse::<usize>().ok())
            .unwrap_or(MAX_UPDATE_COUNT)
            .max(1);
        let async_flush = env::var("RIPPLE_ASYNC").ok().as_deref() != Some("0");
        let silent = env::var("RIPPLE_SILENT").ok().as_deref() == Some("1");
        Self {
            max_update_count,
            async_flush,
            silent,
            ..Self::default()
        }
    }

    /// Replace the global error handler.
    #[inline]
    #[must_use]
    pub fn with_error_handler(
        mut self,
        handler: impl Fn(&anyhow::Error, Option<&Rc<dyn ErrorScope>>, &str) -> anyhow::Result<()>
        + 'static,
    ) -> Self {
        self.error_handler = Some(Rc::new(handler));
        self
    }

    /// Replace the warning handler.
    #[inline]
    #[must_use]
    pub fn with_warn_handler(mut self, handler: impl Fn(&str) + 'static) -> Self {
        self.warn_handler = Some(Rc::new(handler));
        self
    }
}

thread_local! {
    static CONFIG: RefCell<Config> = RefCell::new(Config::default());
}

/// Install `config` for the current thread, returning the previous configuration.
#[inline]
pub fn set_config(config: Config) -> Config {
    CONFIG.with(|cell| cell.replace(config))
}

/// Read the current thread's configuration.
#[inline]
pub fn with_config<R>(read: impl FnOnce(&Config) -> R) -> R {
    CONFIG.with(|cell| read(&cell.borrow()))
}

/// Mutate the current thread's configuration in place.
#[inline]
pub fn update_config(mutate: impl FnOnce(&mut Config)) {
    CONFIG.with(|cell| mutate(&mut cell.borrow_mut()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_matches_constant() {
        let config = Config::default();
        assert_eq!(config.max_update_count, MAX_UPDATE_COUNT);
        assert!(config.async_flush);
        assert!(!config.silent);
    }

    #[test]
    fn set_config_returns_previous() {
        let previous = set_config(Config {
            max_update_count: 3,
            ..Config::default()
        });
        assert_eq!(with_config(|config| config.max_update_count), 3);
        let replaced = set_config(previous);
        assert_eq!(replaced.max_update_count, 3);
    }
}
