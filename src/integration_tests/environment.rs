//! What environment the launched command sees.

use std::{collections::HashSet, ffi::CStr};

use crate::{env_entry, spawn_nowait, system_nowait, Allowlist, LaunchEnv};

use super::util;

/// The command's environment is the allowlisted part of ours, plus the
/// additional entries, and nothing else (bar what the shell exports itself).
#[test]
fn only_allowlisted_and_additional_entries() {
    util::init_logging();
    let out = tempfile::NamedTempFile::new().unwrap();
    let job = env_entry("NOWAIT_JOB", "42").unwrap();
    let mode = env_entry("NOWAIT_MODE", "integration test").unwrap();
    let extra: [&CStr; 2] = [&job, &mode];

    let command = format!("env -0 > {}", util::sh_quote(out.path()));
    let pid = system_nowait(&command, Some(&extra[..])).expect("launch failed");
    assert!(pid.as_raw() > 0);
    assert_eq!(util::wait_exit_code(pid), 0);

    let seen = util::read_env_dump(out.path());
    assert!(seen.contains(&("NOWAIT_JOB".to_string(), "42".to_string())));
    assert!(seen.contains(&("NOWAIT_MODE".to_string(), "integration test".to_string())));

    // Everything allowlisted that we have, the command has too.
    for (key, value) in std::env::vars_os() {
        let key = key.to_string_lossy().into_owned();
        if Allowlist::DEFAULT.contains(key.as_bytes()) && !util::SHELL_EXPORTS.contains(&key.as_str()) {
            let expected = (key, value.to_string_lossy().into_owned());
            assert!(seen.contains(&expected), "missing {expected:?}");
        }
    }

    // And nothing else.
    for (key, _) in &seen {
        assert!(
            Allowlist::DEFAULT.contains(key.as_bytes())
                || key == "NOWAIT_JOB"
                || key == "NOWAIT_MODE"
                || util::SHELL_EXPORTS.contains(&key.as_str()),
            "unexpected variable leaked: {key}"
        );
    }
}

#[test]
fn custom_allowlist_restricts_inherited_keys() {
    util::init_logging();
    let out = tempfile::NamedTempFile::new().unwrap();
    let command = format!("env -0 > {}", util::sh_quote(out.path()));
    let keys = ["PATH"];
    let env = LaunchEnv::new(&command).with_allowlist(Allowlist::new(&keys));

    let pid = spawn_nowait(&env).expect("launch failed");
    assert_eq!(util::wait_exit_code(pid), 0);

    let keys: HashSet<String> = util::read_env_dump(out.path()).into_iter().map(|(k, _)| k).collect();
    for key in &keys {
        assert!(
            key == "PATH" || util::SHELL_EXPORTS.contains(&key.as_str()),
            "unexpected variable leaked: {key}"
        );
    }
    if std::env::var_os("PATH").is_some() {
        assert!(keys.contains("PATH"));
    }
    assert!(!keys.contains("HOME"));
}

/// The command line goes through `sh -c`, so expansions happen.
#[test]
fn shell_expands_the_command() {
    util::init_logging();
    let out = tempfile::NamedTempFile::new().unwrap();
    let job = env_entry("NOWAIT_JOB", "42").unwrap();
    let extra: [&CStr; 1] = [&job];
    let command = format!("echo \"$NOWAIT_JOB-$((1 + 1))\" > {}", util::sh_quote(out.path()));

    let pid = system_nowait(&command, Some(&extra[..])).expect("launch failed");
    assert_eq!(util::wait_exit_code(pid), 0);
    assert_eq!(std::fs::read_to_string(out.path()).unwrap(), "42-2\n");
}

/// Does not wait for the command.
#[test]
fn returns_without_waiting() {
    util::init_logging();
    let (pid, elapsed) = util::timed(|| system_nowait("sleep 30", None));
    let pid = pid.expect("launch failed");
    assert!(pid.as_raw() > 0);
    assert!(elapsed.as_secs() < 10, "launch blocked for {elapsed:?}");
    util::kill_and_reap(pid);
}
