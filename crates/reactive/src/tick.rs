//! Deferred callbacks.
//!
//! `next_tick` batches callbacks into a single deferred task. There is no
//! event loop in this crate: the host drives it by calling
//! [`run_microtasks`], [`run_macrotask`] or [`run_until_idle`] at the points
//! where a browser would drain its microtask queue or pick the next task.
//!
//! ```text
//! next_tick(a) ─┐
//! next_tick(b) ─┼─► callbacks [a, b] ──► one microtask (or macrotask inside
//! next_tick(c) ─┘                         with_macro_task) ──► a(); b(); c()
//! ```

use core::cell::RefCell;
use core::mem;
use log::trace;
use std::collections::VecDeque;
use tokio::sync::oneshot;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct TickState {
    callbacks: Vec<Task>,
    pending: bool,
    use_macro_task: bool,
    microtasks: VecDeque<Task>,
    macrotasks: VecDeque<Task>,
}

thread_local! {
    static TICK: RefCell<TickState> = RefCell::new(TickState::default());
}

/// Run `callback` after the current synchronous work, together with every
/// other callback scheduled before the tick fires.
pub fn next_tick(callback: impl FnOnce() + 'static) {
    TICK.with_borrow_mut(|tick| {
        tick.callbacks.push(Box::new(callback));
        if mem::replace(&mut tick.pending, true) {
            return;
        }
        let flush: Task = Box::new(flush_callbacks);
        if tick.use_macro_task {
            tick.macrotasks.push_back(flush);
        } else {
            tick.microtasks.push_back(flush);
        }
    });
}

/// Future form of [`next_tick`]: the receiver resolves once the tick ran.
pub fn next_tick_future() -> oneshot::Receiver<()> {
    let (sender, receiver) = oneshot::channel();
    next_tick(move || {
        if sender.send(()).is_err() {
            trace!("next_tick receiver dropped before the tick ran");
        }
    });
    receiver
}

/// Run `body` with ticks it schedules deferred to a macrotask.
pub fn with_macro_task<R>(body: impl FnOnce() -> R) -> R {
    let previous = TICK.with_borrow_mut(|tick| mem::replace(&mut tick.use_macro_task, true));
    let result = body();
    TICK.with_borrow_mut(|tick| tick.use_macro_task = previous);
    result
}

fn flush_callbacks() {
    let callbacks = TICK.with_borrow_mut(|tick| {
        tick.pending = false;
        mem::take(&mut tick.callbacks)
    });
    trace!("Running {} tick callbacks", callbacks.len());
    for callback in callbacks {
        callback();
    }
}

/// Queue work on the microtask queue.
pub fn queue_microtask(task: impl FnOnce() + 'static) {
    TICK.with_borrow_mut(|tick| tick.microtasks.push_back(Box::new(task)));
}

/// Queue work on the macrotask queue, e.g. a timer firing.
pub fn queue_macrotask(task: impl FnOnce() + 'static) {
    TICK.with_borrow_mut(|tick| tick.macrotasks.push_back(Box::new(task)));
}

/// Drain the microtask queue, including microtasks queued while draining.
///
/// Returns the number of tasks run.
pub fn run_microtasks() -> usize {
    let mut ran = 0;
    while let Some(task) = TICK.with_borrow_mut(|tick| tick.microtasks.pop_front()) {
        task();
        ran += 1;
    }
    ran
}

/// Run the oldest macrotask followed by a microtask checkpoint.
///
/// Returns `false` when there was no macrotask.
pub fn run_macrotask() -> bool {
    let Some(task) = TICK.with_borrow_mut(|tick| tick.macrotasks.pop_front()) else {
        return false;
    };
    task();
    run_microtasks();
    true
}

/// Run microtasks and macrotasks until both queues are empty.
pub fn run_until_idle() {
    run_microtasks();
    while run_macrotask() {}
}

/// Whether any task is queued.
pub fn has_pending_tasks() -> bool {
    TICK.with_borrow(|tick| !tick.microtasks.is_empty() || !tick.macrotasks.is_empty())
}
