//! GPIO-toggle demo.
//!
//! Registers a 100 ms toggle service against a 10 ms master clock, runs for
//! a few seconds and prints the collected statistics. The actual pin access
//! is a collaborator concern; here the callback just logs the level it
//! would drive. The toggle bit lives in the closure, so a second
//! independently-scheduled instance of the same logic needs no shared
//! statics.

use std::time::Duration;

use rtsequencer::{SeqResult, Sequencer, ServiceSpec};

fn main() -> SeqResult<()> {
    env_logger::init();

    let mut seq = Sequencer::new();

    let mut level = false;
    let handle = seq.add_service(
        ServiceSpec::new(
            move || {
                level = !level;
                log::info!("gpio23 -> {}", if level { "high" } else { "low" });
            },
            99,
            0,
            Duration::from_millis(100),
        )
        .named("gpio23-toggle"),
    )?;

    seq.start_services(Duration::from_millis(10))?;
    log::info!("sequencer running; toggling for 5 seconds");

    // A real deployment would hand this to a SIGINT handler; the demo just
    // fires it from a timer thread.
    let stop = seq.stop_handle();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(5));
        stop.request_stop();
    });

    std::thread::sleep(Duration::from_secs(5));
    seq.stop_services();

    if let Some(snapshot) = seq.statistics(handle) {
        println!("{}", snapshot);
    }
    Ok(())
}
