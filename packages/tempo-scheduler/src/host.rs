//! The boundary between the scheduler and its embedding host.
//!
//! The scheduler never owns a clock or an event loop; it asks the host for
//! the time, for "run this on your next turn", and for a single cancellable
//! delayed callback. Which next-turn primitive gets used is decided once, at
//! scheduler construction, from the host's advertised capabilities.

use thiserror::Error;

/// Absolute milliseconds since the host clock's epoch.
pub type Millis = u64;

/// A closure the host is asked to invoke on a later turn of its event loop.
pub type TurnFn = Box<dyn FnOnce()>;

/// Identifier of an armed host timeout, for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Which optional primitives this host supports. Queried once at scheduler
/// construction; the answers must not change afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostCapabilities {
    /// [`Host::set_immediate`] works.
    pub immediate: bool,
    /// [`Host::post_message`] works.
    pub message_channel: bool,
    /// [`Host::set_timeout`] / [`Host::clear_timeout`] work.
    pub timer: bool,
    /// [`Host::has_pending_input`] gives a real answer.
    pub input_pending: bool,
}

impl HostCapabilities {
    pub fn all() -> Self {
        Self {
            immediate: true,
            message_channel: true,
            timer: true,
            input_pending: true,
        }
    }
}

/// Services the embedding environment provides to the scheduler.
///
/// Only [`Host::now`] and [`Host::capabilities`] are required. The optional
/// primitives default to inert no-ops; the scheduler only calls the ones the
/// capability mask advertises, except for `set_timeout`, whose `None` return
/// doubles as "no timer primitive here" (delayed tasks then never become
/// eligible — a degraded configuration, not an error).
pub trait Host {
    /// Current time in milliseconds. Must be monotonic in practice; a
    /// wall clock normalized to a process-start epoch is acceptable.
    fn now(&self) -> Millis;

    fn capabilities(&self) -> HostCapabilities;

    /// Run `turn` on the next turn of the host event loop, after currently
    /// queued host work but before any further delay.
    fn set_immediate(&self, turn: TurnFn) {
        let _ = turn;
    }

    /// Run `turn` asynchronously but promptly via a dedicated message
    /// channel.
    fn post_message(&self, turn: TurnFn) {
        let _ = turn;
    }

    /// Run `turn` after `delay` milliseconds. Returns `None` when the host
    /// has no timer primitive.
    fn set_timeout(&self, delay: Millis, turn: TurnFn) -> Option<TimerId> {
        let _ = (delay, turn);
        None
    }

    fn clear_timeout(&self, id: TimerId) {
        let _ = id;
    }

    /// Whether an input event is queued right now. Used purely as a yield
    /// signal; hosts without the capability report `false` and the yield
    /// policy degrades to time-budget-only.
    fn has_pending_input(&self) -> bool {
        false
    }
}

/// The primitive selected for arming the next work-loop turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextTurn {
    /// [`Host::set_immediate`].
    Immediate,
    /// [`Host::post_message`].
    MessageChannel,
    /// [`Host::set_timeout`] with zero delay — the universal fallback.
    ZeroTimeout,
    /// The host offers nothing; scheduling is inert.
    Inert,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("host exposes no primitive for scheduling the next turn")]
    NoNextTurnPrimitive,
}

/// Picks the best available next-turn primitive, in preference order:
/// immediate callback, then message channel, then zero-delay timer.
pub fn select_next_turn(caps: HostCapabilities) -> Result<NextTurn, HostError> {
    if caps.immediate {
        Ok(NextTurn::Immediate)
    } else if caps.message_channel {
        Ok(NextTurn::MessageChannel)
    } else if caps.timer {
        Ok(NextTurn::ZeroTimeout)
    } else {
        Err(HostError::NoNextTurnPrimitive)
    }
}
