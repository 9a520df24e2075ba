//! Fine-grained reactivity for the ripple UI runtime.
//!
//! State lives in [`Value`] trees. Once a tree is [`observe`]d, tracked reads
//! performed by a running [`Watcher`] subscribe it to the [`Dep`] of every
//! field and container it touched, and writes notify those subscribers. The
//! [`scheduler`] collapses the resulting re-runs into one ordered flush per
//! tick.
//!
//! Everything here is single-threaded: the target stack, the observer side
//! table, the scheduler queue, the tick queue and the [`Config`] are all
//! thread-local.

pub mod config;
pub mod dep;
pub mod error;
pub mod ids;
pub mod observer;
pub mod scheduler;
pub mod tick;
pub mod traverse;
pub mod value;
pub mod watcher;

pub use config::{Config, MAX_UPDATE_COUNT, set_config, update_config, with_config};
pub use dep::{Dep, TargetGuard, current_target, is_tracking, pop_target, push_target, untracked};
pub use error::{CaptureHook, ErrorScope, ReactiveError, global_handle_error, handle_error, warn};
pub use ids::{ContainerId, DepId, WatcherId};
pub use observer::{
    Observer, PropKey, define_reactive, delete, is_observed, observe, reactive, set,
    should_observe, toggle_observing, without_observing,
};
pub use scheduler::{flush_now, flush_scheduler_queue, queue_watcher};
pub use tick::{next_tick, next_tick_future, run_macrotask, run_microtasks, run_until_idle, with_macro_task};
pub use traverse::traverse;
pub use value::{ReactiveArray, ReactiveObject, Value, same_value};
pub use watcher::{Callback, Getter, WatchHandle, WatchOptions, Watcher, WeakWatcher, watch};
