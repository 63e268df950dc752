//! Priority levels and their deadline offsets.
//!
//! Each level maps to a fixed offset in milliseconds; a task submitted at
//! level `p` expires at `start_time + timeout_for(p)`, and the ready queue is
//! ordered by expiration. `Immediate` expires in the past, so it always sorts
//! ahead of fresh work at every other level. `Idle` effectively never
//! expires, so it only runs once everything else has drained.

/// Largest value representable in a signed 31-bit integer. Used as the
/// `Idle` offset: far enough out that idle tasks sort behind everything,
/// small enough that the expiration arithmetic stays well away from overflow.
pub const MAX_SIGNED_31_BIT: i64 = 1_073_741_823;

pub const IMMEDIATE_PRIORITY_TIMEOUT: i64 = -1;
pub const USER_BLOCKING_PRIORITY_TIMEOUT: i64 = 250;
pub const NORMAL_PRIORITY_TIMEOUT: i64 = 5000;
pub const LOW_PRIORITY_TIMEOUT: i64 = 10_000;
pub const IDLE_PRIORITY_TIMEOUT: i64 = MAX_SIGNED_31_BIT;

/// Urgency class of a submitted task.
///
/// Discriminants are stable and public: hosts that persist or transmit a
/// priority can round-trip it as an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Priority {
    /// Sentinel for "no particular priority"; scheduled with `Normal` timing.
    None = 0,
    Immediate = 1,
    UserBlocking = 2,
    #[default]
    Normal = 3,
    Low = 4,
    Idle = 5,
}

/// Deadline offset in milliseconds for a priority level.
///
/// `None` falls back to the `Normal` offset rather than failing.
pub fn timeout_for(priority: Priority) -> i64 {
    match priority {
        Priority::Immediate => IMMEDIATE_PRIORITY_TIMEOUT,
        Priority::UserBlocking => USER_BLOCKING_PRIORITY_TIMEOUT,
        Priority::Low => LOW_PRIORITY_TIMEOUT,
        Priority::Idle => IDLE_PRIORITY_TIMEOUT,
        Priority::Normal | Priority::None => NORMAL_PRIORITY_TIMEOUT,
    }
}
