//! A deterministic in-memory [`Host`] for tests and examples.
//!
//! The virtual host owns a manual clock, a FIFO of armed turns, and a table
//! of pending timeouts. Tests drive it explicitly: `advance` moves the clock
//! and fires due timers, `run_turn`/`run_until_idle` pump the armed turns.
//! Nothing happens between those calls, so every interleaving is
//! reproducible.

use crate::host::{Host, HostCapabilities, Millis, TimerId, TurnFn};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Which host primitive a turn or timeout was armed through. Recorded so
/// tests can assert on the scheduler's strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmedVia {
    Immediate,
    MessageChannel,
    Timeout(Millis),
}

struct PendingTimer {
    due: Millis,
    turn: TurnFn,
}

struct Inner {
    caps: HostCapabilities,
    now: Cell<Millis>,
    input_pending: Cell<bool>,
    turns: RefCell<VecDeque<TurnFn>>,
    timers: RefCell<FxHashMap<u64, PendingTimer>>,
    next_timer_id: Cell<u64>,
    armed_log: RefCell<Vec<ArmedVia>>,
}

/// Cheaply clonable handle; clones share the same clock and queues, so one
/// copy can be handed to the scheduler and another kept by the test.
#[derive(Clone)]
pub struct VirtualHost {
    inner: Rc<Inner>,
}

impl VirtualHost {
    /// A host with every capability.
    pub fn new() -> Self {
        Self::with_capabilities(HostCapabilities::all())
    }

    /// A host with only the given capabilities, for degraded-environment
    /// scenarios.
    pub fn with_capabilities(caps: HostCapabilities) -> Self {
        Self {
            inner: Rc::new(Inner {
                caps,
                now: Cell::new(0),
                input_pending: Cell::new(false),
                turns: RefCell::new(VecDeque::new()),
                timers: RefCell::new(FxHashMap::default()),
                next_timer_id: Cell::new(1),
                armed_log: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Advances the clock by `ms` and fires every timer that became due, in
    /// (due time, arming order) order.
    pub fn advance(&self, ms: Millis) {
        self.inner.now.set(self.inner.now.get() + ms);
        self.fire_due_timers();
    }

    /// Runs the oldest armed turn, if any.
    pub fn run_turn(&self) -> bool {
        let turn = self.inner.turns.borrow_mut().pop_front();
        match turn {
            Some(turn) => {
                turn();
                true
            }
            None => false,
        }
    }

    /// Pumps armed turns and already-due timers until neither remains. Does
    /// not move the clock.
    pub fn run_until_idle(&self) {
        loop {
            let ran_turn = self.run_turn();
            let fired = self.fire_due_timers();
            if !ran_turn && fired == 0 {
                return;
            }
        }
    }

    pub fn now(&self) -> Millis {
        self.inner.now.get()
    }

    pub fn set_input_pending(&self, pending: bool) {
        self.inner.input_pending.set(pending);
    }

    /// Number of turns currently armed and waiting.
    pub fn turn_count(&self) -> usize {
        self.inner.turns.borrow().len()
    }

    /// Number of timeouts currently pending.
    pub fn timer_count(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Every arming the scheduler has performed, oldest first.
    pub fn armed_log(&self) -> Vec<ArmedVia> {
        self.inner.armed_log.borrow().clone()
    }

    fn fire_due_timers(&self) -> usize {
        let now = self.inner.now.get();
        let mut due: Vec<(Millis, u64)> = self
            .inner
            .timers
            .borrow()
            .iter()
            .filter(|(_, t)| t.due <= now)
            .map(|(&id, t)| (t.due, id))
            .collect();
        due.sort_unstable();

        let fired = due.len();
        for (_, id) in due {
            let timer = self.inner.timers.borrow_mut().remove(&id);
            if let Some(timer) = timer {
                (timer.turn)();
            }
        }
        fired
    }
}

impl Default for VirtualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for VirtualHost {
    fn now(&self) -> Millis {
        self.inner.now.get()
    }

    fn capabilities(&self) -> HostCapabilities {
        self.inner.caps
    }

    fn set_immediate(&self, turn: TurnFn) {
        if self.inner.caps.immediate {
            self.inner.armed_log.borrow_mut().push(ArmedVia::Immediate);
            self.inner.turns.borrow_mut().push_back(turn);
        }
    }

    fn post_message(&self, turn: TurnFn) {
        if self.inner.caps.message_channel {
            self.inner
                .armed_log
                .borrow_mut()
                .push(ArmedVia::MessageChannel);
            self.inner.turns.borrow_mut().push_back(turn);
        }
    }

    fn set_timeout(&self, delay: Millis, turn: TurnFn) -> Option<TimerId> {
        if !self.inner.caps.timer {
            return None;
        }
        let id = self.inner.next_timer_id.get();
        self.inner.next_timer_id.set(id + 1);
        self.inner.armed_log.borrow_mut().push(ArmedVia::Timeout(delay));
        self.inner.timers.borrow_mut().insert(
            id,
            PendingTimer {
                due: self.inner.now.get() + delay,
                turn,
            },
        );
        Some(TimerId(id))
    }

    fn clear_timeout(&self, id: TimerId) {
        self.inner.timers.borrow_mut().remove(&id.0);
    }

    fn has_pending_input(&self) -> bool {
        self.inner.caps.input_pending && self.inner.input_pending.get()
    }
}
