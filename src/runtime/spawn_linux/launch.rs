// SPDX-License-Identifier: MIT

//! Launch the child process without waiting for it.

use std::{
    ffi::{c_char, CStr, CString},
    os::unix::ffi::OsStrExt as _,
    ptr,
};

use nix::{errno::Errno, libc, unistd::Pid};

use crate::runtime::{
    LOG_TARGET,
    environ::{append_environment, filter_environment, InheritedEnv},
    error::SpawnError,
    spawn::{Allowlist, LaunchEnv},
    spawn_linux::{
        child_log::{self, Level, LogLine},
        fd::{close_fds_above_brute_force, close_fds_above_with},
    },
};

/// Number of slots, sentinel included, in the child's environment array.
pub const ENV_CAPACITY: usize = 1024;

/// Exit status of the child when the shell could not be exec'd.
pub const EXEC_FAILED_STATUS: i32 = libc::EIO;

/// Handle the child process launching.
pub fn launch_nowait(env: &LaunchEnv<'_>) -> Result<Pid, SpawnError> {
    // As much as possible is performed before the fork.
    // That's because, according to the fork docs:
    //
    // > In a multithreaded program, only [async-signal-safe] functions like `pause`
    // > and `_exit` may be called by the child (the parent isn't restricted) until
    // > a call of `execve(2)`. Note that memory allocation may **not** be
    // > async-signal-safe and thus must be prevented.
    let shell = CString::new(env.shell.as_os_str().as_bytes())?;
    let command = CString::new(env.command)?;
    let argv: [*const c_char; 4] = [
        c"sh".as_ptr(),
        c"-c".as_ptr(),
        command.as_ptr(),
        ptr::null(),
    ];
    let child_env = ChildEnv {
        allowlist: &env.allowlist,
        additional: env.additional_env,
    };

    match unsafe { nix::unistd::fork() } {
        Err(errno) => {
            log::error!(target: LOG_TARGET, "fork failed for command '{}': {errno}", env.command);
            Err(SpawnError::ForkFailed(errno))
        }
        Ok(nix::unistd::ForkResult::Child) => exec_in_child(&shell, &argv, &child_env),
        Ok(nix::unistd::ForkResult::Parent { child }) => {
            log::debug!(target: LOG_TARGET, "started pid {child}: {}", env.command);
            Ok(child)
        }
    }
}

/// What the child needs to assemble its environment.
struct ChildEnv<'a> {
    allowlist: &'a Allowlist<'a>,
    additional: Option<&'a [&'a CStr]>,
}

/// Everything the child does between `fork` and `execve`.
///
/// Minimal execution contract: this runs in a copy of a possibly
/// multi-threaded process with only one thread left, so it must not
/// allocate, must not take locks (this includes the `log` facade and
/// stdio), and must end in `execve` or `_exit`.
///
/// The order is fixed: descriptors are closed before the environment is
/// assembled, and both are done before the shell replaces this image.
fn exec_in_child(shell: &CStr, argv: &[*const c_char; 4], child_env: &ChildEnv<'_>) -> ! {
    if let Err(errno) = close_fds_above_with(libc::STDERR_FILENO, |fd, errno| {
        child_log::log(Level::Warn, format_args!("error closing fd={fd}: {errno}"));
    }) {
        child_log::log(
            Level::Warn,
            format_args!("cannot list /proc/self/fd ({errno}); closing by range"),
        );
        close_fds_above_brute_force(libc::STDERR_FILENO);
    }

    let mut env: [Option<&CStr>; ENV_CAPACITY] = [None; ENV_CAPACITY];
    // The capacity is non-zero, so neither of these can fail.
    let inherited = unsafe { InheritedEnv::current() };
    let _ = filter_environment(&mut env, Some(inherited), child_env.allowlist);
    let _ = append_environment(&mut env, child_env.additional.map(|e| e.iter().copied()));

    let mut envp: [*const c_char; ENV_CAPACITY] = [ptr::null(); ENV_CAPACITY];
    for (slot, entry) in envp.iter_mut().zip(env.iter()) {
        match entry {
            Some(entry) => *slot = entry.as_ptr(),
            None => break,
        }
    }

    unsafe { libc::execve(shell.as_ptr(), argv.as_ptr(), envp.as_ptr()) };

    // To reach here means the exec failed.
    let errno = Errno::last();
    let mut line = LogLine::new(Level::Error);
    line.push_bytes(b"error executing command '");
    line.push_bytes(unsafe { CStr::from_ptr(argv[2]) }.to_bytes());
    let _ = std::fmt::Write::write_fmt(&mut line, format_args!("' after fork: {errno}"));
    line.emit();
    unsafe { libc::_exit(EXEC_FAILED_STATUS) }
}
