//! Error routing and warnings.
//!
//! User code (getters, callbacks, render functions, hooks) reports failures
//! as `anyhow::Error`. Those errors never unwind through the scheduler: they
//! are handed to [`handle_error`], which offers them to the `error_captured`
//! hooks of every ancestor scope and then to the configured global handler.

use crate::config::with_config;
use crate::dep::untracked;
use crate::ids::WatcherId;
use core::error::Error;
use core::fmt;
use log::{error, warn as log_warn};
use std::rc::Rc;

/// An `error_captured` hook.
///
/// Receives the error and the info string; returns `Ok(false)` to stop the
/// error from propagating further up the chain.
pub type CaptureHook = Rc<dyn Fn(&anyhow::Error, &str) -> anyhow::Result<bool>>;

/// A node in the ownership chain errors propagate through, usually a component.
pub trait ErrorScope {
    /// The owning scope, if any.
    fn parent_scope(&self) -> Option<Rc<dyn ErrorScope>>;

    /// Hooks registered on this scope, in registration order.
    fn capture_hooks(&self) -> Vec<CaptureHook>;

    /// Human readable name used in log output.
    fn scope_name(&self) -> String {
        String::from("<anonymous>")
    }
}

/// Conditions detected by the reactive core itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactiveError {
    /// A watch expression contained characters outside `[A-Za-z0-9_.$]`.
    InvalidPath { expression: String },
    /// `set`/`delete` was called on a value that is neither an object nor an array.
    InvalidTarget {
        operation: &'static str,
        found: &'static str,
    },
    /// A non-index key was used on an array target.
    NonIndexKey { key: String },
    /// A watcher kept re-queueing itself within a single flush.
    InfiniteUpdateLoop {
        watcher: WatcherId,
        expression: String,
    },
}

impl fmt::Display for ReactiveError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath { expression } => write!(
                formatter,
                "Failed watching path: \"{expression}\". Watchers only accept simple dot-delimited paths; use a function getter instead"
            ),
            Self::InvalidTarget { operation, found } => write!(
                formatter,
                "Cannot {operation} a reactive property on a {found} value"
            ),
            Self::NonIndexKey { key } => {
                write!(formatter, "Key \"{key}\" is not a valid array index")
            }
            Self::InfiniteUpdateLoop { watcher, expression } => write!(
                formatter,
                "You may have an infinite update loop in watcher {watcher} with expression \"{expression}\""
            ),
        }
    }
}

impl Error for ReactiveError {}

/// Route an error raised by user code.
///
/// Ancestors of `scope` are visited from the nearest outward; each of their
/// capture hooks runs in order. A hook returning `Ok(false)` consumes the
/// error. A hook that fails has its own error sent to the global handler and
/// propagation continues. Dependency tracking is suspended while hooks run.
pub fn handle_error(err: &anyhow::Error, scope: Option<&Rc<dyn ErrorScope>>, info: &str) {
    untracked(|| {
        if let Some(origin) = scope {
            let mut current = origin.parent_scope();
            while let Some(ancestor) = current {
                for hook in ancestor.capture_hooks() {
                    match hook(err, info) {
                        Ok(false) => return,
                        Ok(true) => {}
                        Err(hook_error) => {
                            global_handle_error(&hook_error, Some(&ancestor), "errorCaptured hook");
                        }
                    }
                }
                current = ancestor.parent_scope();
            }
        }
        global_handle_error(err, scope, info);
    });
}

/// Hand an error to the configured global handler, logging it when there is
/// none or when the handler itself fails.
pub fn global_handle_error(err: &anyhow::Error, scope: Option<&Rc<dyn ErrorScope>>, info: &str) {
    let handler = with_config(|config| config.error_handler.clone());
    if let Some(handler) = handler {
        match handler(err, scope, info) {
            Ok(()) => return,
            Err(handler_error) => log_error(&handler_error, None, "config.error_handler"),
        }
    }
    log_error(err, scope, info);
}

fn log_error(err: &anyhow::Error, scope: Option<&Rc<dyn ErrorScope>>, info: &str) {
    let name = scope.map_or_else(|| String::from("<root>"), |owner| owner.scope_name());
    error!("Error in {info} (found in {name}): {err:#}");
}

/// Emit a runtime warning.
///
/// Warnings go to the log and to the configured warn handler unless the
/// configuration is silent.
pub fn warn(message: &str) {
    let (silent, handler) = with_config(|config| (config.silent, config.warn_handler.clone()));
    if silent {
        return;
    }
    log_warn!("{message}");
    if let Some(handler) = handler {
        handler(message);
    }
}
