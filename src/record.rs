/* -------------------------------------------------------------------------- */
/*                                   Import                                   */
/* -------------------------------------------------------------------------- */

use std::collections::HashMap;
use std::time::{Duration, Instant};

/* -------------------------------------------------------------------------- */
/*                                    Types                                   */
/* -------------------------------------------------------------------------- */

/// Whether a program is relaunched after it exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Launch once; never relaunch regardless of how it exits.
    OneShot,
    /// Relaunch whenever it exits, subject to the flap detector.
    Restart,
}

impl Default for Policy {
    fn default() -> Self {
        Policy::Restart
    }
}

/// The lifecycle state of a single supervised program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    /// Never launched yet, or about to be relaunched.
    Pending,
    /// A child is running.
    Active,
    /// A terminate-request has been issued; waiting for the child to exit.
    Stopping,
    /// The child has exited and the record is idle.
    Stopped,
    /// The most recent launch attempt failed before a child ever ran.
    LaunchFailed,
}

impl ProgramState {
    /// States in which a live `child_id` must be present.
    pub fn has_live_child(self) -> bool {
        matches!(self, ProgramState::Active | ProgramState::Stopping)
    }

    pub fn label(self) -> &'static str {
        match self {
            ProgramState::Pending => "Pending",
            ProgramState::Active => "Active",
            ProgramState::Stopping => "Stopping",
            ProgramState::Stopped => "Stopped",
            ProgramState::LaunchFailed => "LaunchFailed",
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Struct                                  */
/* -------------------------------------------------------------------------- */

/// A single entry in the supervised roster, and all the bookkeeping the
/// state machine needs to decide what to do with it next.
#[derive(Debug, Clone)]
pub struct ProgramRecord {
    pub name: String,
    pub command: String,
    pub argv: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_directory: Option<String>,
    pub policy: Policy,
    pub shutdown_deadline: Duration,
    pub quick_restart_window: Duration,
    pub quick_restart_threshold: u32,

    pub state: ProgramState,
    pub child_id: Option<u32>,
    pub restart_count: u64,
    pub last_launch_time: Option<Instant>,
    pub quick_restart_count: u32,
    /// Set when a terminate-request is issued; used to drive the grace-period
    /// escalation to SIGKILL.
    pub stopping_since: Option<Instant>,
}

/* -------------------------------------------------------------------------- */
/*                             Struct Implementation                          */
/* -------------------------------------------------------------------------- */

impl ProgramRecord {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        argv: Vec<String>,
        policy: Policy,
        shutdown_deadline: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            argv,
            env: HashMap::new(),
            working_directory: None,
            policy,
            shutdown_deadline,
            quick_restart_window: Duration::from_secs(10),
            quick_restart_threshold: 5,
            state: ProgramState::Pending,
            child_id: None,
            restart_count: 0,
            last_launch_time: None,
            quick_restart_count: 0,
            stopping_since: None,
        }
    }

    /// The presence of a pid must agree with the state: live states carry
    /// one, idle states don't.
    pub fn respects_child_id_invariant(&self) -> bool {
        self.child_id.is_some() == self.state.has_live_child()
    }

    pub fn is_one_shot(&self) -> bool {
        self.policy == Policy::OneShot
    }
}
