//! The line-oriented event stream. Each event renders to a fixed literal
//! line; `emit` then routes that rendered line through `tracing` at the
//! appropriate level so a JSON or file subscriber can be swapped in
//! downstream without touching call sites.

/* -------------------------------------------------------------------------- */
/*                                   Import                                   */
/* -------------------------------------------------------------------------- */

use std::fmt;

use tracing::{error, info, warn};

use crate::record::ProgramRecord;

/* -------------------------------------------------------------------------- */
/*                                    Types                                   */
/* -------------------------------------------------------------------------- */

pub enum Event<'a> {
    Launched { name: &'a str, pid: u32 },
    LaunchFailed { name: &'a str, reason: String },
    Exited { name: &'a str },
    Terminating { name: &'a str },
    StatusDump { records: &'a [ProgramRecord] },
    RestartingRunlevel,
    Aborting { reason: AbortKind },
    FinalExit { code: i32 },
}

#[derive(Clone, Copy)]
pub enum AbortKind {
    Shutdown,
    Flapping,
}

/* -------------------------------------------------------------------------- */
/*                             Trait Implementation                           */
/* -------------------------------------------------------------------------- */

impl fmt::Display for AbortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortKind::Shutdown => write!(f, "shutdown"),
            AbortKind::Flapping => write!(f, "flapping"),
        }
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Launched { name, pid } => write!(f, "launched {name} pid={pid}"),
            Event::LaunchFailed { name, reason } => {
                write!(f, "launch-failed {name} reason={reason}")
            }
            Event::Exited { name } => write!(f, "exited {name}"),
            Event::Terminating { name } => write!(f, "terminating {name}"),
            Event::StatusDump { records } => {
                writeln!(f, "status-dump")?;
                for (i, r) in records.iter().enumerate() {
                    let pid = r
                        .child_id
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    write!(
                        f,
                        "  {name} state={state} restart_count={count} pid={pid}",
                        name = r.name,
                        state = r.state.label(),
                        count = r.restart_count,
                    )?;
                    if i + 1 != records.len() {
                        writeln!(f)?;
                    }
                }
                Ok(())
            }
            Event::RestartingRunlevel => write!(f, "restarting-runlevel"),
            Event::Aborting { reason } => write!(f, "aborting reason={reason}"),
            Event::FinalExit { code } => write!(f, "final-exit code={code}"),
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                  Function                                  */
/* -------------------------------------------------------------------------- */

/// Render `event` and push it onto the tracing stack at the level the
/// event kind warrants: lifecycle events at info, launch failures at warn,
/// the fatal path at error.
pub fn emit(event: Event<'_>) {
    let line = event.to_string();
    match event {
        Event::LaunchFailed { .. } => warn!("{line}"),
        Event::Aborting {
            reason: AbortKind::Flapping,
        } => error!("{line}"),
        Event::FinalExit { code } if code != 0 => error!("{line}"),
        _ => info!("{line}"),
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
