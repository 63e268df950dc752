//! The schedulable unit of work and its metadata.

use crate::heap::HeapEntry;
use crate::host::Millis;
use crate::priority::Priority;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Monotonically increasing task identity. Never reused; meaningful only as
/// the tie-break in heap ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a task callback produced.
pub enum TaskOutcome {
    /// The unit of work is finished; the task is discarded.
    Complete,
    /// The work suspended itself. The returned callback replaces the task's
    /// callback and is invoked on a later work-loop entry, under the same id
    /// and priority.
    Continue(TaskCallback),
}

/// A unit of work. The argument is `did_expire`: whether the task's deadline
/// had already passed when the scheduler got around to invoking it.
pub type TaskCallback = Box<dyn FnOnce(bool) -> TaskOutcome>;

/// The callback slot of a task: pending work, or cleared.
///
/// A cleared slot is how cancellation and completion look to the queues;
/// both treat such an entry as inert and drop it lazily when it surfaces.
pub(crate) enum CallbackSlot {
    Pending(TaskCallback),
    Empty,
}

/// One submitted unit of work plus its scheduling metadata.
///
/// Shared as `Rc<Task>`: the owning queue holds one reference and the
/// caller's [`TaskHandle`] another. `sort_index` equals `start_time` while
/// the task waits in the timer queue and `expiration_time` once it is
/// promoted to the ready queue.
pub struct Task {
    id: TaskId,
    priority: Priority,
    start_time: Millis,
    expiration_time: Millis,
    sort_index: Cell<Millis>,
    callback: RefCell<CallbackSlot>,
}

impl Task {
    pub(crate) fn new(
        id: TaskId,
        priority: Priority,
        start_time: Millis,
        expiration_time: Millis,
        callback: TaskCallback,
    ) -> Self {
        Self {
            id,
            priority,
            start_time,
            expiration_time,
            sort_index: Cell::new(0),
            callback: RefCell::new(CallbackSlot::Pending(callback)),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn start_time(&self) -> Millis {
        self.start_time
    }

    pub fn expiration_time(&self) -> Millis {
        self.expiration_time
    }

    pub(crate) fn sort_index(&self) -> Millis {
        self.sort_index.get()
    }

    pub(crate) fn set_sort_index(&self, index: Millis) {
        self.sort_index.set(index);
    }

    /// Takes the pending callback out, leaving the slot cleared. Clearing
    /// before invocation is what prevents double execution.
    pub(crate) fn take_callback(&self) -> CallbackSlot {
        self.callback.replace(CallbackSlot::Empty)
    }

    /// Reinstates a continuation into the slot.
    pub(crate) fn put_callback(&self, callback: TaskCallback) {
        *self.callback.borrow_mut() = CallbackSlot::Pending(callback);
    }

    pub(crate) fn clear_callback(&self) {
        *self.callback.borrow_mut() = CallbackSlot::Empty;
    }

    pub(crate) fn callback_is_empty(&self) -> bool {
        matches!(*self.callback.borrow(), CallbackSlot::Empty)
    }
}

impl HeapEntry for Rc<Task> {
    fn sort_key(&self) -> (u64, u64) {
        (self.sort_index(), self.id.0)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("start_time", &self.start_time)
            .field("expiration_time", &self.expiration_time)
            .field("sort_index", &self.sort_index.get())
            .field("cancelled", &self.callback_is_empty())
            .finish()
    }
}

/// Caller-side handle to a submitted task.
///
/// Two handles compare equal when they refer to the same submission.
#[derive(Clone)]
pub struct TaskHandle {
    task: Rc<Task>,
}

impl TaskHandle {
    pub(crate) fn new(task: Rc<Task>) -> Self {
        Self { task }
    }

    pub fn id(&self) -> TaskId {
        self.task.id()
    }

    pub fn priority(&self) -> Priority {
        self.task.priority()
    }

    /// Cancels the task by clearing its callback. The queue entry stays put
    /// and is discarded lazily the next time it surfaces; an already-run
    /// task is unaffected. Idempotent.
    pub fn cancel(&self) {
        self.task.clear_callback();
    }

    /// True once the task has been cancelled, has completed, or is mid-run.
    pub fn is_cancelled(&self) -> bool {
        self.task.callback_is_empty()
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.task, &other.task)
    }
}

impl Eq for TaskHandle {}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.task.id())
            .field("priority", &self.task.priority())
            .finish()
    }
}
