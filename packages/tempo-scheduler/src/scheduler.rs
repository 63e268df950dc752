//! The scheduling engine: dual queues, time-sliced work loop, host arming.
//!
//! One `Scheduler` owns all of the state the engine needs (both heaps, the
//! id counter, the armed/pending flags), so independent schedulers can
//! coexist and be tested without shared fixtures. Everything runs on the
//! host's single thread; interior mutability is `Cell`/`RefCell` and queue
//! borrows are never held across a task callback, so callbacks may freely
//! schedule more work re-entrantly.

use crate::heap::MinHeap;
use crate::host::{select_next_turn, Host, Millis, NextTurn, TimerId, TurnFn};
use crate::priority::{timeout_for, Priority};
use crate::task::{CallbackSlot, Task, TaskHandle, TaskId, TaskOutcome};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Time-slice budget per host turn, in milliseconds. Once a turn has been
/// running this long, `should_yield` reports true and the work loop hands
/// control back to the host between tasks.
pub const FRAME_YIELD_MS: Millis = 5;

/// Cooperative, priority-based task scheduler for a single-threaded host.
///
/// Constructed as `Rc<Scheduler<H>>`; the arming closures handed to the host
/// hold only `Weak` references, so dropping every strong reference tears the
/// scheduler down even with turns still queued host-side.
pub struct Scheduler<H: Host> {
    host: H,
    next_turn: NextTurn,
    /// Self-reference handed to arming closures; never upgraded while a
    /// method is running, only when the host later invokes a turn.
    weak_self: Weak<Scheduler<H>>,

    /// Ready queue: eligible tasks, ordered by expiration time.
    task_queue: RefCell<MinHeap<Rc<Task>>>,
    /// Timer queue: delayed tasks, ordered by start time.
    timer_queue: RefCell<MinHeap<Rc<Task>>>,

    task_id_counter: Cell<u64>,
    current_priority: Cell<Priority>,

    /// A work-loop run has been requested but not yet entered.
    host_callback_scheduled: Cell<bool>,
    /// The host has a turn queued (or about to be queued) for the work loop.
    host_callback_armed: Cell<bool>,
    /// The self-re-arming turn chain is live.
    message_loop_running: Cell<bool>,
    /// Re-entrancy guard: a task callback is executing right now, so a
    /// submission from inside it must not arm a second loop.
    performing_work: Cell<bool>,

    /// A delayed re-check (`handle_timeout`) is armed. At most one in
    /// flight; always cancelled before a new one is armed.
    host_timeout_scheduled: Cell<bool>,
    timeout_id: Cell<Option<TimerId>>,

    /// When the current host turn started; basis of the yield budget.
    turn_start: Cell<Millis>,
}

/// Restores the `finally` block of the flush path even if a callback panics.
struct FlushGuard<'a> {
    performing_work: &'a Cell<bool>,
    current_priority: &'a Cell<Priority>,
    previous: Priority,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.performing_work.set(false);
        self.current_priority.set(self.previous);
    }
}

/// Settles the turn on exit: re-arms the loop when more work remains, else
/// clears the armed state. `has_more` starts true, so a panicking callback
/// unwinds to the host with the next turn already armed and the remaining
/// tasks still get their slices.
struct TurnGuard<'a, H: Host + 'static> {
    scheduler: &'a Scheduler<H>,
    has_more: bool,
}

impl<H: Host + 'static> Drop for TurnGuard<'_, H> {
    fn drop(&mut self) {
        if self.has_more {
            self.scheduler.schedule_next_turn();
        } else {
            self.scheduler.message_loop_running.set(false);
            self.scheduler.host_callback_armed.set(false);
        }
    }
}

impl<H: Host + 'static> Scheduler<H> {
    /// Builds a scheduler, selecting the host's best next-turn primitive
    /// once. A host with no next-turn primitive at all yields an inert
    /// scheduler (logged at warn level): submissions are accepted but no
    /// turn will ever run them.
    pub fn new(host: H) -> Rc<Self> {
        let next_turn = match select_next_turn(host.capabilities()) {
            Ok(strategy) => strategy,
            Err(err) => {
                tracing::warn!(%err, "scheduler will be inert");
                NextTurn::Inert
            }
        };
        Self::with_strategy(host, next_turn)
    }

    /// Like [`Scheduler::new`], but fails instead of degrading when the host
    /// offers no next-turn primitive.
    pub fn try_new(host: H) -> Result<Rc<Self>, crate::host::HostError> {
        let next_turn = select_next_turn(host.capabilities())?;
        Ok(Self::with_strategy(host, next_turn))
    }

    fn with_strategy(host: H, next_turn: NextTurn) -> Rc<Self> {
        tracing::debug!(?next_turn, "scheduler initialized");
        Rc::new_cyclic(|weak| Self {
            host,
            next_turn,
            weak_self: weak.clone(),
            task_queue: RefCell::new(MinHeap::new()),
            timer_queue: RefCell::new(MinHeap::new()),
            task_id_counter: Cell::new(1),
            current_priority: Cell::new(Priority::Normal),
            host_callback_scheduled: Cell::new(false),
            host_callback_armed: Cell::new(false),
            message_loop_running: Cell::new(false),
            performing_work: Cell::new(false),
            host_timeout_scheduled: Cell::new(false),
            timeout_id: Cell::new(None),
            turn_start: Cell::new(0),
        })
    }

    /// Submits a unit of work at the given priority, eligible immediately.
    pub fn schedule<F>(&self, priority: Priority, callback: F) -> TaskHandle
    where
        F: FnOnce(bool) -> TaskOutcome + 'static,
    {
        self.schedule_delayed(priority, 0, callback)
    }

    /// Submits a unit of work that becomes eligible after `delay`
    /// milliseconds. Never errors; a zero delay is an immediate submission.
    ///
    /// The returned handle identifies the task and can cancel it. There is
    /// no unsubmit: cancellation clears the callback and the queues discard
    /// the stale entry lazily when it surfaces.
    pub fn schedule_delayed<F>(
        &self,
        priority: Priority,
        delay: Millis,
        callback: F,
    ) -> TaskHandle
    where
        F: FnOnce(bool) -> TaskOutcome + 'static,
    {
        let current_time = self.host.now();
        let start_time = if delay > 0 {
            current_time + delay
        } else {
            current_time
        };
        let expiration_time = start_time.saturating_add_signed(timeout_for(priority));

        let id = TaskId(self.task_id_counter.get());
        self.task_id_counter.set(id.0 + 1);
        let task = Rc::new(Task::new(
            id,
            priority,
            start_time,
            expiration_time,
            Box::new(callback),
        ));
        tracing::trace!(%id, ?priority, delay, "task scheduled");

        if start_time > current_time {
            // A true future delay: park it in the timer queue.
            task.set_sort_index(start_time);
            self.timer_queue.borrow_mut().push(task.clone());

            let is_earliest = self
                .peek_timer()
                .is_some_and(|head| Rc::ptr_eq(&head, &task));
            if self.task_queue.borrow().is_empty() && is_earliest {
                // This task is now the next deadline; retire any older
                // armed timeout before arming for it.
                if self.host_timeout_scheduled.get() {
                    self.cancel_host_timeout();
                } else {
                    self.host_timeout_scheduled.set(true);
                }
                self.request_host_timeout(delay);
            }
        } else {
            task.set_sort_index(expiration_time);
            self.task_queue.borrow_mut().push(task.clone());

            if !self.host_callback_scheduled.get() && !self.performing_work.get() {
                self.host_callback_scheduled.set(true);
                self.request_host_callback();
            }
        }

        TaskHandle::new(task)
    }

    /// Whether a long-running callback should stop and return a
    /// continuation: true once an input event is pending host-side or the
    /// current turn has consumed its [`FRAME_YIELD_MS`] budget.
    pub fn should_yield(&self) -> bool {
        if self.host.has_pending_input() {
            return true;
        }
        self.host.now().saturating_sub(self.turn_start.get()) >= FRAME_YIELD_MS
    }

    /// Priority of the task currently executing, or the last one restored.
    pub fn current_priority(&self) -> Priority {
        self.current_priority.get()
    }

    /// True while either queue still holds entries (including stale
    /// cancelled ones not yet lazily dropped).
    pub fn has_pending_work(&self) -> bool {
        !self.task_queue.borrow().is_empty() || !self.timer_queue.borrow().is_empty()
    }

    /// The next-turn primitive selected at construction.
    pub fn next_turn_strategy(&self) -> NextTurn {
        self.next_turn
    }

    /// Runs one work-loop pass synchronously, as if a host turn fired right
    /// now. Returns whether more ready work remains. For embedders that
    /// drive the scheduler from their own frame loop instead of the arming
    /// primitives; calling it with both queues empty is a no-op.
    pub fn flush(&self) -> bool {
        let current_time = self.host.now();
        self.turn_start.set(current_time);
        self.flush_work(true, current_time)
    }

    /// Clears any armed delayed re-check.
    pub fn cancel_host_timeout(&self) {
        if let Some(id) = self.timeout_id.take() {
            self.host.clear_timeout(id);
        }
    }

    /// Entry point for a host turn (the `performWorkUntilDeadline` wrapper).
    fn on_host_turn(&self) {
        if !self.host_callback_armed.get() {
            self.message_loop_running.set(false);
            return;
        }
        let current_time = self.host.now();
        self.turn_start.set(current_time);

        let mut guard = TurnGuard {
            scheduler: self,
            has_more: true,
        };
        guard.has_more = self.flush_work(true, current_time);
    }

    fn flush_work(&self, has_time_remaining: bool, initial_time: Millis) -> bool {
        self.host_callback_scheduled.set(false);
        if self.host_timeout_scheduled.get() {
            // The deferred re-check is redundant now that work is flushing.
            self.host_timeout_scheduled.set(false);
            self.cancel_host_timeout();
        }

        self.performing_work.set(true);
        let _restore = FlushGuard {
            performing_work: &self.performing_work,
            current_priority: &self.current_priority,
            previous: self.current_priority.get(),
        };
        self.work_loop(has_time_remaining, initial_time)
    }

    /// Drains the ready queue until it empties, a continuation is produced,
    /// or the head is not yet urgent and the yield policy fires. Returns
    /// whether ready work remains.
    fn work_loop(&self, has_time_remaining: bool, initial_time: Millis) -> bool {
        let mut current_time = initial_time;
        self.advance_timers(current_time);

        loop {
            let Some(task) = self.peek_task() else { break };

            if task.expiration_time() > current_time
                && (!has_time_remaining || self.should_yield())
            {
                // Head is not overdue and the slice is spent; leave it at
                // the head and hand the thread back.
                return true;
            }

            match task.take_callback() {
                CallbackSlot::Pending(callback) => {
                    self.current_priority.set(task.priority());
                    let did_expire = task.expiration_time() <= current_time;
                    tracing::trace!(id = %task.id(), did_expire, "running task");

                    let outcome = callback(did_expire);
                    // The callback may have taken arbitrary time.
                    current_time = self.host.now();

                    match outcome {
                        TaskOutcome::Continue(next) => {
                            // Same task, same id and priority; resumed on
                            // the next loop entry so the host can yield
                            // between continuation steps.
                            task.put_callback(next);
                            self.advance_timers(current_time);
                            return true;
                        }
                        TaskOutcome::Complete => {
                            // Pop only if still the head; a re-entrant
                            // submission may have displaced it, in which
                            // case the cleared slot gets dropped lazily.
                            let still_head = self
                                .peek_task()
                                .is_some_and(|head| Rc::ptr_eq(&head, &task));
                            if still_head {
                                self.task_queue.borrow_mut().pop();
                            }
                            self.advance_timers(current_time);
                        }
                    }
                }
                CallbackSlot::Empty => {
                    // Cancelled while queued; discard now that it surfaced.
                    self.task_queue.borrow_mut().pop();
                }
            }
        }

        // Ready queue drained; arm a re-check for the earliest timer.
        if let Some(first_timer) = self.peek_timer() {
            self.request_host_timeout(first_timer.start_time().saturating_sub(current_time));
        }
        false
    }

    /// Moves every due timer into the ready queue and drops cancelled ones,
    /// stopping at the first timer still in the future.
    fn advance_timers(&self, current_time: Millis) {
        loop {
            let Some(timer) = self.peek_timer() else { return };

            if timer.callback_is_empty() {
                self.timer_queue.borrow_mut().pop();
            } else if timer.start_time() <= current_time {
                self.timer_queue.borrow_mut().pop();
                timer.set_sort_index(timer.expiration_time());
                tracing::trace!(id = %timer.id(), "timer promoted to ready queue");
                self.task_queue.borrow_mut().push(timer);
            } else {
                return;
            }
        }
    }

    /// Fires when the armed host timeout elapses: promotes due timers, then
    /// either requests a work-loop turn or re-arms for the next deadline.
    fn handle_timeout(&self, current_time: Millis) {
        self.host_timeout_scheduled.set(false);
        self.advance_timers(current_time);

        if !self.host_callback_scheduled.get() {
            if self.peek_task().is_some() {
                self.host_callback_scheduled.set(true);
                self.request_host_callback();
            } else if let Some(first_timer) = self.peek_timer() {
                self.request_host_timeout(first_timer.start_time().saturating_sub(current_time));
            }
        }
    }

    fn request_host_callback(&self) {
        self.host_callback_armed.set(true);
        if !self.message_loop_running.get() {
            self.message_loop_running.set(true);
            self.schedule_next_turn();
        }
    }

    fn schedule_next_turn(&self) {
        let weak = self.weak_self.clone();
        let turn: TurnFn = Box::new(move || {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.on_host_turn();
            }
        });

        match self.next_turn {
            NextTurn::Immediate => self.host.set_immediate(turn),
            NextTurn::MessageChannel => self.host.post_message(turn),
            NextTurn::ZeroTimeout => {
                self.host.set_timeout(0, turn);
            }
            NextTurn::Inert => {
                tracing::trace!("dropping turn request: host has no next-turn primitive");
            }
        }
    }

    fn request_host_timeout(&self, delay: Millis) {
        let weak = self.weak_self.clone();
        let id = self.host.set_timeout(
            delay,
            Box::new(move || {
                if let Some(scheduler) = weak.upgrade() {
                    let current_time = scheduler.host.now();
                    scheduler.handle_timeout(current_time);
                }
            }),
        );
        if id.is_none() {
            tracing::warn!(delay, "host has no timer primitive; delayed work will not be promoted");
        }
        self.timeout_id.set(id);
    }

    fn peek_task(&self) -> Option<Rc<Task>> {
        self.task_queue.borrow().peek().cloned()
    }

    fn peek_timer(&self) -> Option<Rc<Task>> {
        self.timer_queue.borrow().peek().cloned()
    }
}
