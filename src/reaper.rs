//! The Reaper: given a child-exited notification, non-blocking poll every
//! live child and reap whichever have actually exited. The OS may coalesce
//! multiple exits into one notification, so this always walks the whole
//! active set rather than stopping at the first hit.

/* -------------------------------------------------------------------------- */
/*                                   Import                                   */
/* -------------------------------------------------------------------------- */

use std::collections::HashMap;
use std::process::Child;

use tracing::warn;

use crate::error::ControllerError;
use crate::record::{ProgramRecord, ProgramState};

/* -------------------------------------------------------------------------- */
/*                                  Function                                  */
/* -------------------------------------------------------------------------- */

/// Poll every record in `records` that currently has a live child, reaping
/// any whose child has exited. Returns the names of programs reaped this
/// pass, in iteration order (not wall-clock exit order).
pub fn reap(records: &mut [ProgramRecord], children: &mut HashMap<String, Child>) -> Vec<String> {
    let mut exited = Vec::new();

    for record in records.iter_mut() {
        if !record.state.has_live_child() {
            continue;
        }
        let Some(child) = children.get_mut(&record.name) else {
            // Invariant violation: state says a child should be alive but
            // we have no handle for it. Log and leave the record alone
            // rather than crash.
            let err = ControllerError::UntrackedChild(record.name.clone());
            warn!(program = %record.name, "{err}");
            continue;
        };

        match child.try_wait() {
            Ok(Some(_status)) => {
                record.state = ProgramState::Stopped;
                record.child_id = None;
                record.stopping_since = None;
                children.remove(&record.name);
                exited.push(record.name.clone());
            }
            Ok(None) => {
                // still running, leave untouched
            }
            Err(err) => {
                warn!(program = %record.name, error = %err, "error polling child status");
            }
        }
    }

    exited
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */
