use std::cell::Cell;
use std::rc::Rc;
use tempo_scheduler::{
    ArmedVia, HostCapabilities, HostError, NextTurn, Priority, Scheduler, TaskOutcome, VirtualHost,
};

#[test]
fn immediate_primitive_is_preferred() {
    let host = VirtualHost::new();
    let scheduler = Scheduler::new(host.clone());
    assert_eq!(scheduler.next_turn_strategy(), NextTurn::Immediate);
}

#[test]
fn message_channel_is_used_when_immediate_is_missing() {
    let host = VirtualHost::with_capabilities(HostCapabilities {
        message_channel: true,
        timer: true,
        ..Default::default()
    });
    let scheduler = Scheduler::new(host.clone());
    assert_eq!(scheduler.next_turn_strategy(), NextTurn::MessageChannel);

    let ran = Rc::new(Cell::new(false));
    {
        let ran = ran.clone();
        scheduler.schedule(Priority::Normal, move |_| {
            ran.set(true);
            TaskOutcome::Complete
        });
    }
    assert_eq!(host.armed_log(), vec![ArmedVia::MessageChannel]);

    host.run_until_idle();
    assert!(ran.get());
}

#[test]
fn zero_delay_timer_is_the_universal_fallback() {
    let host = VirtualHost::with_capabilities(HostCapabilities {
        timer: true,
        ..Default::default()
    });
    let scheduler = Scheduler::new(host.clone());
    assert_eq!(scheduler.next_turn_strategy(), NextTurn::ZeroTimeout);

    let ran = Rc::new(Cell::new(false));
    {
        let ran = ran.clone();
        scheduler.schedule(Priority::Normal, move |_| {
            ran.set(true);
            TaskOutcome::Complete
        });
    }
    assert_eq!(host.armed_log(), vec![ArmedVia::Timeout(0)]);

    host.run_until_idle();
    assert!(ran.get());
}

#[test]
fn a_host_with_no_primitives_yields_an_inert_scheduler() {
    let host = VirtualHost::with_capabilities(HostCapabilities::default());

    assert!(matches!(
        Scheduler::try_new(host.clone()),
        Err(HostError::NoNextTurnPrimitive)
    ));

    // The lenient constructor degrades instead of failing: submissions are
    // accepted but nothing ever runs them.
    let scheduler = Scheduler::new(host.clone());
    assert_eq!(scheduler.next_turn_strategy(), NextTurn::Inert);

    let ran = Rc::new(Cell::new(false));
    {
        let ran = ran.clone();
        scheduler.schedule(Priority::Immediate, move |_| {
            ran.set(true);
            TaskOutcome::Complete
        });
    }
    host.run_until_idle();
    assert!(!ran.get());
    assert!(scheduler.has_pending_work());

    // A manual flush still drains it, for hosts that pump by hand.
    assert!(!scheduler.flush());
    assert!(ran.get());
}
