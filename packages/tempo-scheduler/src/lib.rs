//! Cooperative, priority-based task scheduler for single-threaded hosts.
//!
//! Callers submit callbacks tagged with a [`Priority`] and an optional start
//! delay; the scheduler services higher-priority and longer-waiting work
//! first, runs it in short time slices on the host's event loop, and lets a
//! unit of work suspend itself by returning a continuation
//! ([`TaskOutcome::Continue`]) without losing its identity or priority.
//!
//! The host environment is abstracted behind the [`Host`] trait: a clock, a
//! "run this on your next turn" primitive (selected once from the host's
//! capabilities), one cancellable timeout, and an optional pending-input
//! signal for the yield policy. [`VirtualHost`] is a deterministic in-memory
//! host for tests and for embedders that pump the loop themselves.
//!
//! ```
//! use tempo_scheduler::{Priority, Scheduler, TaskOutcome, VirtualHost};
//!
//! let host = VirtualHost::new();
//! let scheduler = Scheduler::new(host.clone());
//!
//! scheduler.schedule(Priority::UserBlocking, |_did_expire| {
//!     // ...do a slice of work...
//!     TaskOutcome::Complete
//! });
//!
//! host.run_until_idle();
//! ```

pub mod heap;
pub mod host;
pub mod priority;
pub mod scheduler;
pub mod task;
pub mod virtual_host;

pub use host::{Host, HostCapabilities, HostError, Millis, NextTurn, TimerId};
pub use priority::Priority;
pub use scheduler::{Scheduler, FRAME_YIELD_MS};
pub use task::{TaskCallback, TaskHandle, TaskId, TaskOutcome};
pub use virtual_host::{ArmedVia, VirtualHost};
