//! CLI entry point. Loads a roster, spins up the Signal Router and the
//! GraceTick ticker, then drains the command queue on the calling thread;
//! that thread *is* the Runlevel Controller.

/* -------------------------------------------------------------------------- */
/*                                   Import                                   */
/* -------------------------------------------------------------------------- */

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{bounded, Sender};
use nix::sys::signal::{raise, sigaction, SigAction, SigHandler, Signal};
use tracing_subscriber::EnvFilter;

use minder::config::load_roster;
use minder::controller::{Controller, Op, Outcome};
use minder::signals::spawn_router;

/* -------------------------------------------------------------------------- */
/*                                  Constants                                 */
/* -------------------------------------------------------------------------- */

/// Commands in flight at once before the queue is considered overflowed.
/// Should be unreachable with sane roster sizes.
const QUEUE_CAPACITY: usize = 256;
const GRACE_TICK_INTERVAL: Duration = Duration::from_millis(250);

/* -------------------------------------------------------------------------- */
/*                                    Struct                                  */
/* -------------------------------------------------------------------------- */

#[derive(Parser, Debug)]
#[command(name = "minderd", about = "A minimalist process supervisor")]
struct Cli {
    /// Path to the YAML roster file describing what to supervise.
    #[arg(long)]
    roster: PathBuf,

    /// tracing-subscriber env-filter directive, e.g. "info" or "minder=debug".
    #[arg(long, default_value = "info")]
    log_level: String,
}

/* -------------------------------------------------------------------------- */
/*                                  Function                                  */
/* -------------------------------------------------------------------------- */

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let records = load_roster(&cli.roster)?;
    let mut controller = Controller::new(records);

    let (tx, rx) = bounded::<Op>(QUEUE_CAPACITY);
    spawn_router(tx.clone())?;
    spawn_grace_ticker(tx.clone());

    tx.send(Op::BringUp).ok();

    for op in rx.iter() {
        match controller.handle(op) {
            Outcome::Continue => {}
            Outcome::Exit(code) => std::process::exit(code),
            Outcome::Fault => {
                restore_default_and_reraise(Signal::SIGSEGV);
                // restore_default_and_reraise does not return, but if the
                // re-raise is somehow suppressed, fail closed.
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// A lightweight ticker thread that periodically asks the Controller to
/// check for overdue graceful shutdowns. Deliberately not a per-record
/// cancellable timer: the Controller only ever reacts to queued commands.
fn spawn_grace_ticker(queue: Sender<Op>) {
    std::thread::spawn(move || loop {
        std::thread::sleep(GRACE_TICK_INTERVAL);
        if queue.send(Op::GraceTick).is_err() {
            break;
        }
    });
}

/// Restore the OS default disposition for `signal` and re-raise it against
/// this process, so a fatal fault still produces the post-mortem (core
/// dump, non-zero wait status) a supervisor crashing outright would have.
fn restore_default_and_reraise(signal: Signal) -> ! {
    unsafe {
        let _ = sigaction(signal, &SigAction::new(SigHandler::SigDfl, nix::sys::signal::SaFlags::empty(), nix::sys::signal::SigSet::empty()));
    }
    let _ = raise(signal);
    // If the default action did not terminate us (should not happen for
    // SIGSEGV), exit non-zero rather than spin.
    std::process::exit(1);
}
