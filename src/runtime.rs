// SPDX-License-Identifier: MIT

//! Manages launching a command in the background.
//!
//! The `spawn_nowait` function is the main entry point.  It takes a
//! `LaunchEnv` structure that describes the shell command to run, the shell
//! that interprets it, the allowlist of inherited environment keys, and any
//! additional environment entries.  It returns the process id of the new
//! child as soon as the child exists; it never waits for the command to
//! finish and never reaps it.
//!
//! Inside the child, before the shell is exec'd, all descriptors above
//! stderr are closed and the environment is rebuilt from the allowlist.

pub mod environ;
pub mod error;
pub mod spawn;

pub use spawn::{Allowlist, LaunchEnv};

/// Log target used for everything this crate reports.
pub const LOG_TARGET: &str = "nowait_exec";

#[cfg(target_os = "linux")]
mod spawn_linux;

#[cfg(target_os = "linux")]
pub use spawn_linux::{ENV_CAPACITY, EXEC_FAILED_STATUS};

/// Launch the command described by `env` without waiting for it.
#[cfg(target_os = "linux")]
pub fn spawn_nowait(env: &LaunchEnv<'_>) -> Result<nix::unistd::Pid, error::SpawnError> {
    spawn_linux::launch_nowait(env)
}

/// Mimic `system(3)`, but return as soon as the child exists.
///
/// Uses `/bin/sh` and the default allowlist.
#[cfg(target_os = "linux")]
pub fn system_nowait(
    command: &str,
    additional_env: Option<&[&std::ffi::CStr]>,
) -> Result<nix::unistd::Pid, error::SpawnError> {
    let mut env = LaunchEnv::new(command);
    env.additional_env = additional_env;
    spawn_linux::launch_nowait(&env)
}

/// Close every open file descriptor above `last_fd_to_keep`.
///
/// Descriptors that fail to close are logged and skipped.
#[cfg(target_os = "linux")]
pub fn close_fds_above(last_fd_to_keep: std::os::fd::RawFd) -> Result<(), error::SpawnError> {
    spawn_linux::fd::close_fds_above_with(last_fd_to_keep, |fd, errno| {
        log::warn!(target: LOG_TARGET, "error closing fd={fd}: {errno}");
    })
    .map_err(|errno| {
        log::error!(target: LOG_TARGET, "cannot open /proc/self/fd: {errno}");
        error::SpawnError::EnumerationUnavailable(errno)
    })
}
