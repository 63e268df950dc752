//! Chunked background work under the frame budget.
//!
//! A single job of 12 items runs at Normal priority; every item "costs" one
//! millisecond of virtual time. Whenever the 5 ms slice budget is spent the
//! job suspends itself with a continuation and the remaining items run on
//! later turns.

use std::cell::Cell;
use std::rc::Rc;
use tempo_scheduler::{Priority, Scheduler, TaskCallback, TaskOutcome, VirtualHost};

fn process_items(
    remaining: Rc<Cell<u32>>,
    scheduler: Rc<Scheduler<VirtualHost>>,
    host: VirtualHost,
) -> TaskCallback {
    Box::new(move |did_expire| {
        while remaining.get() > 0 {
            host.advance(1);
            remaining.set(remaining.get() - 1);

            if remaining.get() > 0 && scheduler.should_yield() {
                tracing::info!(
                    remaining = remaining.get(),
                    did_expire,
                    "slice budget spent, suspending"
                );
                return TaskOutcome::Continue(process_items(
                    remaining.clone(),
                    scheduler.clone(),
                    host.clone(),
                ));
            }
        }
        tracing::info!("job complete");
        TaskOutcome::Complete
    })
}

fn main() {
    tracing_subscriber::fmt().init();

    let host = VirtualHost::new();
    let scheduler = Scheduler::new(host.clone());

    let remaining = Rc::new(Cell::new(12u32));
    let job = process_items(remaining, scheduler.clone(), host.clone());
    scheduler.schedule(Priority::Normal, move |did_expire| job(did_expire));

    host.run_until_idle();
    tracing::info!(elapsed_ms = host.now(), "virtual time consumed");
}
