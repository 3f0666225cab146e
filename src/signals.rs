//! The Signal Router: the only place in this crate that deals with real OS
//! signal delivery. It never runs Controller logic itself; it just
//! translates each delivered signal into an `Op` and pushes it onto the
//! shared queue, so everything async-signal-unsafe stays off the
//! signal-handling thread (grounded in `signal_hook::iterator::Signals`,
//! which already moves delivery onto an ordinary thread for us).

/* -------------------------------------------------------------------------- */
/*                                   Import                                   */
/* -------------------------------------------------------------------------- */

use crossbeam_channel::Sender;
use signal_hook::consts::{SIGCHLD, SIGINT, SIGSEGV, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::Signals;
use tracing::warn;

use crate::controller::{Op, TerminateReason};

/* -------------------------------------------------------------------------- */
/*                                  Function                                  */
/* -------------------------------------------------------------------------- */

/// Spawn the Signal Router on its own thread, registering the fixed set of
/// signals the supervisor reacts to, and forwarding each as an `Op` onto
/// `queue`. Dropping the returned `JoinHandle` is fine; the thread is
/// daemon-like and exits when the process does.
pub fn spawn_router(queue: Sender<Op>) -> std::io::Result<std::thread::JoinHandle<()>> {
    let mut signals = Signals::new([
        SIGCHLD, SIGINT, SIGTERM, SIGUSR1, SIGUSR2, SIGSEGV,
    ])?;

    let handle = std::thread::spawn(move || {
        for signal in signals.forever() {
            let op = match signal {
                SIGCHLD => Op::ChildNotification,
                SIGINT | SIGTERM => Op::TerminateAll(TerminateReason::Operator),
                SIGUSR1 | SIGUSR2 => Op::DumpStatus,
                SIGSEGV => Op::FatalFault,
                other => {
                    warn!(signal = other, "ignoring unrecognised signal");
                    continue;
                }
            };
            if queue.send(op).is_err() {
                // Receiver gone: the Controller thread has already exited.
                break;
            }
        }
    });

    Ok(handle)
}
