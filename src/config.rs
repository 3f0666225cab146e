//! Roster file loading. This is the concrete, YAML-backed realization of
//! the "caller-supplied list of Program Records" the core state machine
//! treats as an external collaborator.

/* -------------------------------------------------------------------------- */
/*                                   Import                                   */
/* -------------------------------------------------------------------------- */

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::RosterError;
use crate::record::{Policy, ProgramRecord};

/* -------------------------------------------------------------------------- */
/*                                    Struct                                  */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RosterFile {
    #[serde(default)]
    programs: HashMap<String, ProgramEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProgramEntry {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    working_directory: Option<String>,
    #[serde(default)]
    policy: Policy,
    #[serde(default = "default_shutdown_deadline_secs")]
    shutdown_deadline_secs: u64,
    #[serde(default = "default_quick_restart_window_secs")]
    quick_restart_window_secs: u64,
    #[serde(default = "default_quick_restart_threshold")]
    quick_restart_threshold: u32,
}

/* -------------------------------------------------------------------------- */
/*                                  Constants                                 */
/* -------------------------------------------------------------------------- */

fn default_shutdown_deadline_secs() -> u64 {
    5
}

fn default_quick_restart_window_secs() -> u64 {
    10
}

fn default_quick_restart_threshold() -> u32 {
    5
}

/* -------------------------------------------------------------------------- */
/*                              Parsing Functions                             */
/* -------------------------------------------------------------------------- */

/// Load a roster from a YAML file, in the order the file lists programs in
/// (`HashMap` does not preserve order, so we resort by name for determinism
/// in tests and status dumps).
pub fn load_roster(path: &Path) -> Result<Vec<ProgramRecord>, RosterError> {
    let contents = fs::read_to_string(path).map_err(|source| RosterError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_roster(&contents, path)
}

fn parse_roster(contents: &str, path: &Path) -> Result<Vec<ProgramRecord>, RosterError> {
    let file: RosterFile = serde_yaml::from_str(contents).map_err(|source| RosterError::Parse {
        path: path.display().to_string(),
        source,
    })?;

    if file.programs.is_empty() {
        return Err(RosterError::Empty);
    }

    let mut names: Vec<&String> = file.programs.keys().collect();
    names.sort();

    let mut records = Vec::with_capacity(file.programs.len());
    for name in names {
        let entry = &file.programs[name];
        let mut record = ProgramRecord::new(
            name.clone(),
            entry.command.clone(),
            {
                let mut argv = vec![entry.command.clone()];
                argv.extend(entry.args.iter().cloned());
                argv
            },
            entry.policy,
            Duration::from_secs(entry.shutdown_deadline_secs),
        );
        record.env = entry.env.clone();
        record.working_directory = entry.working_directory.clone();
        record.quick_restart_window = Duration::from_secs(entry.quick_restart_window_secs);
        record.quick_restart_threshold = entry.quick_restart_threshold;
        records.push(record);
    }

    Ok(records)
}

/* -------------------------------------------------------------------------- */
/*                                    Tests                                   */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(yaml: &str) -> Result<Vec<ProgramRecord>, RosterError> {
        parse_roster(yaml, Path::new("<test>"))
    }

    #[test]
    fn loads_minimal_program() {
        let records = parse(
            r#"
programs:
  web:
    command: /usr/bin/true
"#,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "web");
        assert_eq!(records[0].argv, vec!["/usr/bin/true".to_string()]);
        assert_eq!(records[0].policy, Policy::Restart);
        assert_eq!(records[0].shutdown_deadline.as_secs(), 5);
    }

    #[test]
    fn rejects_empty_roster() {
        let err = parse("programs: {}\n").unwrap_err();
        assert!(matches!(err, RosterError::Empty));
    }

    #[test]
    fn rejects_unknown_field() {
        let err = parse(
            r#"
programs:
  web:
    command: /usr/bin/true
    bogus: true
"#,
        )
        .unwrap_err();
        assert!(matches!(err, RosterError::Parse { .. }));
    }

    #[test]
    fn orders_records_by_name() {
        let records = parse(
            r#"
programs:
  zeta:
    command: /usr/bin/true
  alpha:
    command: /usr/bin/true
"#,
        )
        .unwrap();
        assert_eq!(records[0].name, "alpha");
        assert_eq!(records[1].name, "zeta");
    }

    #[test]
    fn loads_from_real_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            "programs:\n  one-shot-job:\n    command: /bin/true\n    policy: one-shot\n"
        )
        .unwrap();
        let records = load_roster(f.path()).unwrap();
        assert_eq!(records[0].policy, Policy::OneShot);
    }
}
