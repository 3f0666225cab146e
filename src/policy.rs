//! The Restart Policy: a function over a Program Record and the current
//! time, deciding what happens after that record's child has exited.
//! Consulted by the Controller; it applies the returned decision.

/* -------------------------------------------------------------------------- */
/*                                   Import                                   */
/* -------------------------------------------------------------------------- */

use std::time::Instant;

use crate::record::ProgramRecord;

/* -------------------------------------------------------------------------- */
/*                                    Types                                   */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    FlappingRestart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Relaunch,
    LeaveStopped,
    AbortRunlevel(AbortReason),
}

/* -------------------------------------------------------------------------- */
/*                                  Function                                  */
/* -------------------------------------------------------------------------- */

/// Decide what should happen to `record`, which has just exited, as of
/// `now`. Mutates `record.quick_restart_count`: that counter is
/// restart-policy bookkeeping, not Controller state, so it is updated here
/// rather than by the caller.
pub fn decide(record: &mut ProgramRecord, now: Instant) -> Decision {
    if record.is_one_shot() {
        return Decision::LeaveStopped;
    }

    match record.last_launch_time {
        Some(last) if now.saturating_duration_since(last) < record.quick_restart_window => {
            record.quick_restart_count += 1;
            if record.quick_restart_count > record.quick_restart_threshold {
                return Decision::AbortRunlevel(AbortReason::FlappingRestart);
            }
        }
        _ => {
            record.quick_restart_count = 0;
        }
    }

    Decision::Relaunch
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Policy;
    use std::time::Duration;

    fn record_with_policy(policy: Policy) -> ProgramRecord {
        ProgramRecord::new("p", "/bin/true", vec!["/bin/true".into()], policy, Duration::from_secs(5))
    }

    #[test]
    fn one_shot_never_relaunches() {
        let mut r = record_with_policy(Policy::OneShot);
        r.last_launch_time = Some(Instant::now());
        assert_eq!(decide(&mut r, Instant::now()), Decision::LeaveStopped);
    }

    #[test]
    fn first_exit_relaunches() {
        let mut r = record_with_policy(Policy::Restart);
        assert!(r.last_launch_time.is_none());
        assert_eq!(decide(&mut r, Instant::now()), Decision::Relaunch);
        assert_eq!(r.quick_restart_count, 0);
    }

    #[test]
    fn slow_exit_outside_window_resets_counter() {
        let mut r = record_with_policy(Policy::Restart);
        r.quick_restart_count = 3;
        r.quick_restart_window = Duration::from_millis(1);
        r.last_launch_time = Some(Instant::now() - Duration::from_secs(1));
        assert_eq!(decide(&mut r, Instant::now()), Decision::Relaunch);
        assert_eq!(r.quick_restart_count, 0);
    }

    #[test]
    fn flap_is_detected_after_threshold_quick_restarts() {
        let mut r = record_with_policy(Policy::Restart);
        r.quick_restart_threshold = 2;
        r.quick_restart_window = Duration::from_secs(10);
        r.last_launch_time = Some(Instant::now());

        assert_eq!(decide(&mut r, Instant::now()), Decision::Relaunch);
        assert_eq!(r.quick_restart_count, 1);

        r.last_launch_time = Some(Instant::now());
        assert_eq!(decide(&mut r, Instant::now()), Decision::Relaunch);
        assert_eq!(r.quick_restart_count, 2);

        r.last_launch_time = Some(Instant::now());
        assert_eq!(
            decide(&mut r, Instant::now()),
            Decision::AbortRunlevel(AbortReason::FlappingRestart)
        );
        assert_eq!(r.quick_restart_count, 3);
    }
}
