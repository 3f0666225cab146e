/* -------------------------------------------------------------------------- */
/*                                   Import                                   */
/* -------------------------------------------------------------------------- */

use thiserror::Error;

/* -------------------------------------------------------------------------- */
/*                                    Error                                   */
/* -------------------------------------------------------------------------- */

/// Errors raised while loading and validating a roster file.
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("could not read roster file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse roster file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("roster is empty, nothing to supervise")]
    Empty,
}

/// Errors raised by the Launcher when a Program Record cannot be turned
/// into a running child.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("spawn primitive failed for {name}: {source}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not exec {command} for {name}: {source}")]
    ExecFailed {
        name: String,
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl LaunchError {
    /// Classify a `std::io::Error` from `Command::spawn` into exec-failure
    /// (bad path / perms) vs. spawn-primitive failure (resource exhaustion
    /// and everything else).
    pub fn from_io(name: &str, command: &str, source: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match source.kind() {
            NotFound | PermissionDenied => LaunchError::ExecFailed {
                name: name.to_owned(),
                command: command.to_owned(),
                source,
            },
            _ => LaunchError::SpawnFailed {
                name: name.to_owned(),
                source,
            },
        }
    }
}

/// Errors the Controller logs and discards rather than propagates. Neither
/// variant is fatal: the roster state is left consistent either way, and
/// the caller moves on to the next queued command.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("program {0} is marked live but has no tracked child handle")]
    UntrackedChild(String),

    #[error("could not signal {name}: {source}")]
    SignalFailed {
        name: String,
        #[source]
        source: nix::Error,
    },
}
