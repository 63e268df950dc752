use std::cell::RefCell;
use std::rc::Rc;
use tempo_scheduler::{ArmedVia, Priority, Scheduler, TaskOutcome, VirtualHost};

type Log = Rc<RefCell<Vec<&'static str>>>;

fn log_task(log: &Log, label: &'static str) -> impl FnOnce(bool) -> TaskOutcome + 'static {
    let log = log.clone();
    move |_| {
        log.borrow_mut().push(label);
        TaskOutcome::Complete
    }
}

#[test]
fn higher_urgency_runs_first_regardless_of_submission_order() {
    let host = VirtualHost::new();
    let scheduler = Scheduler::new(host.clone());
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    scheduler.schedule(Priority::Idle, log_task(&log, "idle"));
    scheduler.schedule(Priority::Low, log_task(&log, "low"));
    scheduler.schedule(Priority::Normal, log_task(&log, "normal"));
    scheduler.schedule(Priority::Immediate, log_task(&log, "immediate"));
    scheduler.schedule(Priority::UserBlocking, log_task(&log, "user_blocking"));

    host.run_until_idle();

    assert_eq!(
        *log.borrow(),
        vec!["immediate", "user_blocking", "normal", "low", "idle"]
    );
}

#[test]
fn immediate_runs_before_normal_submitted_at_same_instant() {
    let host = VirtualHost::new();
    let scheduler = Scheduler::new(host.clone());
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    scheduler.schedule(Priority::Immediate, log_task(&log, "x"));
    scheduler.schedule(Priority::Normal, log_task(&log, "y"));

    host.run_until_idle();

    assert_eq!(*log.borrow(), vec!["x", "y"]);
}

#[test]
fn equal_urgency_runs_in_submission_order() {
    let host = VirtualHost::new();
    let scheduler = Scheduler::new(host.clone());
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    for label in ["first", "second", "third"] {
        scheduler.schedule(Priority::Normal, log_task(&log, label));
    }

    host.run_until_idle();

    assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn idle_work_still_runs_once_everything_else_drains() {
    let host = VirtualHost::new();
    let scheduler = Scheduler::new(host.clone());
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    scheduler.schedule(Priority::Idle, log_task(&log, "idle"));
    scheduler.schedule(Priority::Normal, log_task(&log, "normal"));

    host.run_until_idle();

    assert_eq!(*log.borrow(), vec!["normal", "idle"]);
    assert!(!scheduler.has_pending_work());
}

#[test]
fn drain_on_empty_queues_is_an_idempotent_no_op() {
    let host = VirtualHost::new();
    let scheduler = Scheduler::new(host.clone());

    assert!(!scheduler.flush());
    assert!(!scheduler.flush());
    host.run_until_idle();
    assert!(!scheduler.has_pending_work());
}

#[test]
fn reentrant_submission_arms_the_loop_exactly_once() {
    let host = VirtualHost::new();
    let scheduler = Scheduler::new(host.clone());
    let log: Log = Rc::new(RefCell::new(Vec::new()));

    {
        let log = log.clone();
        let inner = scheduler.clone();
        scheduler.schedule(Priority::Normal, move |_| {
            log.borrow_mut().push("outer");
            let log = log.clone();
            inner.schedule(Priority::Normal, move |_| {
                log.borrow_mut().push("inner");
                TaskOutcome::Complete
            });
            TaskOutcome::Complete
        });
    }

    host.run_until_idle();

    assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    // One arming for the outer submission; the inner one landed while the
    // loop was already performing work.
    assert_eq!(host.armed_log(), vec![ArmedVia::Immediate]);
}

#[test]
fn handles_identify_tasks_and_ids_are_monotonic() {
    let host = VirtualHost::new();
    let scheduler = Scheduler::new(host.clone());

    let a = scheduler.schedule(Priority::Normal, |_| TaskOutcome::Complete);
    let b = scheduler.schedule(Priority::Normal, |_| TaskOutcome::Complete);

    assert_ne!(a, b);
    assert_eq!(a.clone(), a);
    assert!(a.id() < b.id());
    assert_eq!(a.priority(), Priority::Normal);
}
