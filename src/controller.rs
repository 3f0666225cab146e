//! The Runlevel Controller: the single writer of all Program Records, and
//! the serial consumer of the command queue. Every mutation to the roster
//! happens inside `handle`, called once per dequeued `Op`; nothing else in
//! the crate is allowed to touch a record directly.

/* -------------------------------------------------------------------------- */
/*                                   Import                                   */
/* -------------------------------------------------------------------------- */

use std::collections::HashMap;
use std::process::Child;
use std::time::Instant;

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::warn;

use crate::error::ControllerError;
use crate::events::{emit, AbortKind, Event};
use crate::launcher::launch;
use crate::policy::{self, AbortReason, Decision};
use crate::reaper::reap;
use crate::record::{ProgramRecord, ProgramState};

/* -------------------------------------------------------------------------- */
/*                                  Constants                                 */
/* -------------------------------------------------------------------------- */

/// Exit code used when an operator-initiated shutdown completes cleanly.
pub const EXIT_SHUTDOWN: i32 = 0;
/// Distinguished exit code used when the flap detector fires.
pub const EXIT_FLAPPING: i32 = 2;

/* -------------------------------------------------------------------------- */
/*                                    Types                                   */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateReason {
    Operator,
    Flap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Runlevel {
    Starting,
    Progressing,
    Stable,
    AbortingShutdown,
    AbortingFlapping,
}

impl Runlevel {
    fn is_aborting(self) -> bool {
        matches!(self, Runlevel::AbortingShutdown | Runlevel::AbortingFlapping)
    }
}

/// Commands accepted by the Controller. These are what the Signal Router
/// and Reaper enqueue; the Controller never does anything except in
/// response to one of these arriving.
#[derive(Debug, Clone, Copy)]
pub enum Op {
    BringUp,
    /// A SIGCHLD-equivalent notification: "go poll everyone".
    ChildNotification,
    TerminateAll(TerminateReason),
    DumpStatus,
    /// A periodic tick that escalates an overdue graceful shutdown to a
    /// forceful kill. Enqueued by a lightweight timer thread rather than a
    /// per-record cancellable timer, since the Controller only ever reacts
    /// to queued commands.
    GraceTick,
    /// A fatal fault signal (SIGSEGV or equivalent) was delivered to the
    /// supervisor itself. Best-effort teardown, then the caller restores
    /// the OS default disposition and re-raises for a post-mortem.
    FatalFault,
}

/// What the caller (the CLI's event loop) should do after a `handle` call.
pub enum Outcome {
    Continue,
    Exit(i32),
    /// The supervisor itself faulted. The caller must restore the OS
    /// default action for the fault signal and re-raise it; that belongs
    /// outside the Controller, which has no business touching signal
    /// dispositions.
    Fault,
}

/* -------------------------------------------------------------------------- */
/*                                    Struct                                  */
/* -------------------------------------------------------------------------- */

pub struct Controller {
    records: Vec<ProgramRecord>,
    children: HashMap<String, Child>,
    runlevel: Runlevel,
}

/* -------------------------------------------------------------------------- */
/*                             Struct Implementation                          */
/* -------------------------------------------------------------------------- */

impl Controller {
    pub fn new(records: Vec<ProgramRecord>) -> Self {
        Self {
            records,
            children: HashMap::new(),
            runlevel: Runlevel::Starting,
        }
    }

    /// Read-only view of the roster, for status reporting and tests.
    pub fn records(&self) -> &[ProgramRecord] {
        &self.records
    }

    /// Process one dequeued command to completion. This never suspends
    /// except by returning; the caller is the one blocking on the queue.
    pub fn handle(&mut self, op: Op) -> Outcome {
        match op {
            Op::BringUp => {
                self.bring_up();
                Outcome::Continue
            }
            Op::ChildNotification => self.on_child_notification(),
            Op::TerminateAll(reason) => {
                self.terminate_all(reason);
                Outcome::Continue
            }
            Op::DumpStatus => {
                emit(Event::StatusDump { records: &self.records });
                Outcome::Continue
            }
            Op::GraceTick => {
                self.grace_tick();
                Outcome::Continue
            }
            Op::FatalFault => {
                self.force_abort_best_effort();
                Outcome::Fault
            }
        }
    }

    /// Best-effort immediate teardown for the fatal-fault path. Unlike
    /// `terminate_all`, this does not wait for a grace period: the
    /// supervisor is about to re-raise a fault signal and will not get
    /// another chance to run.
    pub fn force_abort_best_effort(&mut self) {
        for record in self.records.iter_mut() {
            if let Some(pid) = record.child_id {
                if let Err(source) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                    let err = ControllerError::SignalFailed { name: record.name.clone(), source };
                    warn!(program = %record.name, "{err}");
                }
            }
            if record.state.has_live_child() {
                record.state = ProgramState::Stopping;
            }
        }
    }

    fn bring_up(&mut self) {
        self.runlevel = Runlevel::Progressing;
        self.launch_all_pending();
        self.runlevel = Runlevel::Stable;
    }

    /// Launch every record that is eligible to run right now: anything not
    /// already live, excluding one-shot records that have already had their
    /// one launch. Called both at bring-up (everyone is Pending) and when
    /// restarting a whole runlevel after a whole-roster crash.
    fn launch_all_pending(&mut self) {
        for record in self.records.iter_mut() {
            if record.state.has_live_child() {
                continue;
            }
            if record.is_one_shot() && record.state != ProgramState::Pending {
                continue;
            }
            match launch(record) {
                Ok(child) => {
                    emit(Event::Launched {
                        name: &record.name,
                        pid: child.id(),
                    });
                    self.children.insert(record.name.clone(), child);
                }
                Err(err) => {
                    emit(Event::LaunchFailed {
                        name: &record.name,
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    fn on_child_notification(&mut self) -> Outcome {
        let exited = reap(&mut self.records, &mut self.children);
        if exited.is_empty() {
            // No newly-exited children: a no-op, since the OS may deliver a
            // notification for something the Reaper already reaped.
            return Outcome::Continue;
        }
        for name in &exited {
            emit(Event::Exited { name });
        }
        self.on_child_exited_algorithm()
    }

    /// Runs once per notification batch. The `still_running` count it
    /// inspects already reflects every child the Reaper just reaped, which
    /// is what makes this coalescing-safe: a batch of three simultaneous
    /// exits only runs this once, not three times.
    fn on_child_exited_algorithm(&mut self) -> Outcome {
        let still_running = self
            .records
            .iter()
            .filter(|r| r.state.has_live_child())
            .count();

        if self.runlevel.is_aborting() && still_running == 0 {
            let code = match self.runlevel {
                Runlevel::AbortingFlapping => EXIT_FLAPPING,
                _ => EXIT_SHUTDOWN,
            };
            emit(Event::FinalExit { code });
            return Outcome::Exit(code);
        }

        if !self.runlevel.is_aborting() && still_running == 0 {
            return self.restart_or_abort_runlevel();
        }

        if still_running > 0 && !self.runlevel.is_aborting() {
            // Partial exit: treat the runlevel as a unit and tear the rest
            // down so the whole-roster-crash branch above fires once
            // everyone has exited.
            self.request_terminate_active_unconditional();
        }

        Outcome::Continue
    }

    fn restart_or_abort_runlevel(&mut self) -> Outcome {
        let now = Instant::now();
        let mut abort = false;
        for record in self.records.iter_mut() {
            if record.is_one_shot() {
                continue;
            }
            match policy::decide(record, now) {
                Decision::Relaunch => {}
                Decision::LeaveStopped => {}
                Decision::AbortRunlevel(AbortReason::FlappingRestart) => {
                    abort = true;
                }
            }
        }

        if abort {
            emit(Event::Aborting { reason: AbortKind::Flapping });
            // Terminate any survivors (should be none at this point, but
            // guard the invariant rather than assume it), then re-enter the
            // algorithm so the aborting-and-drained branch above does the
            // actual exit, rather than duplicating that check here.
            self.terminate_all(TerminateReason::Flap);
            return self.on_child_exited_algorithm();
        }

        emit(Event::RestartingRunlevel);
        self.launch_all_pending();
        Outcome::Continue
    }

    fn terminate_all(&mut self, reason: TerminateReason) {
        self.request_terminate_active_unconditional();
        if !self.runlevel.is_aborting() {
            self.runlevel = match reason {
                TerminateReason::Operator => Runlevel::AbortingShutdown,
                TerminateReason::Flap => Runlevel::AbortingFlapping,
            };
        }
    }

    fn request_terminate_active_unconditional(&mut self) {
        let now = Instant::now();
        for record in self.records.iter_mut() {
            if record.state != ProgramState::Active {
                continue;
            }
            if let Some(pid) = record.child_id {
                if let Err(source) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    let err = ControllerError::SignalFailed { name: record.name.clone(), source };
                    warn!(program = %record.name, "{err}");
                }
            }
            record.state = ProgramState::Stopping;
            record.stopping_since = Some(now);
            emit(Event::Terminating { name: &record.name });
        }
    }

    fn grace_tick(&mut self) {
        if !self.runlevel.is_aborting() {
            return;
        }
        let now = Instant::now();
        for record in self.records.iter_mut() {
            if record.state != ProgramState::Stopping {
                continue;
            }
            let Some(since) = record.stopping_since else { continue };
            if now.saturating_duration_since(since) >= record.shutdown_deadline {
                if let Some(pid) = record.child_id {
                    if let Err(source) = kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                        let err = ControllerError::SignalFailed { name: record.name.clone(), source };
                        warn!(program = %record.name, "{err}");
                    }
                }
            }
        }
    }
}
