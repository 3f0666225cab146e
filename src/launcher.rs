//! The Launcher: turns a Pending/LaunchFailed/Stopped Program Record into a
//! running child, or a classified `LaunchError`.

/* -------------------------------------------------------------------------- */
/*                                   Import                                   */
/* -------------------------------------------------------------------------- */

use std::process::{Child, Command, Stdio};
use std::time::Instant;

use crate::error::LaunchError;
use crate::record::{ProgramRecord, ProgramState};

/* -------------------------------------------------------------------------- */
/*                                  Function                                  */
/* -------------------------------------------------------------------------- */

/// Spawn the child described by `record`, mutating it in place to reflect
/// the outcome. Both success and failure bump `restart_count` and
/// `last_launch_time`; the counter measures attempts, not successes, which
/// is load-bearing for the flap detector.
pub fn launch(record: &mut ProgramRecord) -> Result<Child, LaunchError> {
    debug_assert!(matches!(
        record.state,
        ProgramState::Pending | ProgramState::LaunchFailed | ProgramState::Stopped
    ));

    let argv_rest = record.argv.iter().skip(1);
    let mut cmd = Command::new(&record.command);
    cmd.args(argv_rest)
        .envs(&record.env)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    if let Some(dir) = &record.working_directory {
        cmd.current_dir(dir);
    }

    record.last_launch_time = Some(Instant::now());
    record.restart_count += 1;

    match cmd.spawn() {
        Ok(child) => {
            record.child_id = Some(child.id());
            record.state = ProgramState::Active;
            Ok(child)
        }
        Err(source) => {
            record.child_id = None;
            record.state = ProgramState::LaunchFailed;
            Err(LaunchError::from_io(&record.name, &record.command, source))
        }
    }
}
