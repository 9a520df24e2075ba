//! Batching of watcher re-runs.
//!
//! Watchers notified during a synchronous burst of mutations are queued once
//! each and flushed together on the next tick, ordered by creation id so that
//! parents re-render before children and render watchers run before the user
//! watchers created after them.

use crate::config::with_config;
use crate::error::{ReactiveError, warn};
use crate::ids::WatcherId;
use crate::tick::next_tick;
use crate::watcher::Watcher;
use core::cell::RefCell;
use core::mem;
use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Default)]
struct SchedulerState {
    queue: Vec<Watcher>,
    /// Ids currently queued and not yet run.
    has: FxHashSet<WatcherId>,
    /// Ids that already ran during the current flush.
    ran: FxHashSet<WatcherId>,
    /// Re-runs per id during the current flush.
    circular: FxHashMap<WatcherId, usize>,
    /// Runaway watchers ignored for the rest of the flush.
    skipped: FxHashSet<WatcherId>,
    /// A flush is scheduled or running.
    waiting: bool,
    flushing: bool,
    index: usize,
}

impl SchedulerState {
    fn reset(&mut self) -> Vec<Watcher> {
        self.has.clear();
        self.ran.clear();
        self.circular.clear();
        self.skipped.clear();
        self.waiting = false;
        self.flushing = false;
        self.index = 0;
        mem::take(&mut self.queue)
    }

    /// Position that keeps the not-yet-run part of the queue sorted by id.
    fn insertion_point(&self, id: WatcherId) -> usize {
        let mut position = self.queue.len();
        while position > self.index + 1
            && self
                .queue
                .get(position - 1)
                .is_some_and(|queued| queued.id() > id)
        {
            position -= 1;
        }
        position
    }
}

enum Step {
    Run,
    Runaway,
    Skip,
}

thread_local! {
    static STATE: RefCell<SchedulerState> = RefCell::new(SchedulerState::default());
}

/// Queue `watcher` for the next flush.
///
/// A watcher already queued is not queued again. The first watcher queued
/// after a flush schedules the next one, on the next tick or, when
/// `Config::async_flush` is off, right away.
pub fn queue_watcher(watcher: &Watcher) {
    let id = watcher.id();
    let schedule = STATE.with_borrow_mut(|state| {
        if state.skipped.contains(&id) || !state.has.insert(id) {
            return false;
        }
        if state.flushing {
            let position = state.insertion_point(id);
            state.queue.insert(position, watcher.clone());
        } else {
            state.queue.push(watcher.clone());
        }
        trace!("Queued watcher {id}");
        !mem::replace(&mut state.waiting, true)
    });
    if !schedule {
        return;
    }
    if with_config(|config| config.async_flush) {
        next_tick(flush_scheduler_queue);
    } else {
        flush_scheduler_queue();
    }
}

/// Run every queued watcher.
///
/// The queue is sorted by id first and then walked by index, re-reading its
/// length each step since running a watcher can queue more. A watcher run
/// again more than `Config::max_update_count` times within one flush, by
/// itself or through a cycle with other watchers, is reported and skipped
/// for the rest of the flush. All state is reset afterwards.
pub fn flush_scheduler_queue() {
    let entered = STATE.with_borrow_mut(|state| {
        if state.flushing {
            return false;
        }
        state.flushing = true;
        state.index = 0;
        state.queue.sort_by_key(Watcher::id);
        true
    });
    if !entered {
        return;
    }
    let max_update_count = with_config(|config| config.max_update_count);

    loop {
        let next = STATE.with_borrow(|state| state.queue.get(state.index).cloned());
        let Some(watcher) = next else {
            break;
        };
        let id = watcher.id();
        let step = STATE.with_borrow_mut(|state| {
            if state.skipped.contains(&id) {
                return Step::Skip;
            }
            state.has.remove(&id);
            if state.ran.insert(id) {
                return Step::Run;
            }
            let count = state.circular.entry(id).or_insert(0);
            *count += 1;
            if *count > max_update_count {
                state.skipped.insert(id);
                return Step::Runaway;
            }
            Step::Run
        });
        match step {
            Step::Run => {
                watcher.run_before();
                watcher.run();
            }
            Step::Runaway => warn(
                &ReactiveError::InfiniteUpdateLoop {
                    watcher: id,
                    expression: watcher.expression().to_owned(),
                }
                .to_string(),
            ),
            Step::Skip => {}
        }
        STATE.with_borrow_mut(|state| state.index += 1);
    }

    let flushed = STATE.with_borrow_mut(SchedulerState::reset);
    debug!("Flushed {} watcher runs", flushed.len());
}

/// Flush now if watchers are queued and no flush is running.
pub fn flush_now() {
    if has_pending() {
        flush_scheduler_queue();
    }
}

/// Whether any watcher is waiting for a flush.
pub fn has_pending() -> bool {
    STATE.with_borrow(|state| !state.queue.is_empty() && !state.flushing)
}

/// Whether a flush is currently running.
pub fn is_flushing() -> bool {
    STATE.with_borrow(|state| state.flushing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::{Getter, WatchOptions};
    use crate::value::Value;

    #[test]
    fn insertion_keeps_pending_part_sorted() {
        let first = Watcher::new(Getter::func(|| Ok(Value::Null)), None, WatchOptions::new());
        let second = Watcher::new(Getter::func(|| Ok(Value::Null)), None, WatchOptions::new());
        let third = Watcher::new(Getter::func(|| Ok(Value::Null)), None, WatchOptions::new());
        let state = SchedulerState {
            queue: vec![first.clone(), third.clone()],
            flushing: true,
            ..SchedulerState::default()
        };
        assert_eq!(state.insertion_point(second.id()), 1);
        assert_eq!(state.insertion_point(first.id()), 1);
        let later = SchedulerState {
            index: 1,
            ..state
        };
        assert_eq!(later.insertion_point(second.id()), 2);
    }
}
