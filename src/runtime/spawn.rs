// SPDX-License-Identifier: MIT

//! General model for launching a command in the background.

use std::{ffi::CStr, path::PathBuf};

use crate::runtime::error::SpawnError;

/// Shell used to interpret the command unless another one is requested.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Environment keys passed (if present) from the launching process to the
/// command when no other allowlist is requested.
const DEFAULT_KEYS: &[&str] = &[
    "USER",
    "LOGNAME",
    "HOME",
    "LANG",
    "LC_ALL",
    "LC_COLLATE",
    "LC_CTYPE",
    "LC_MESSAGES",
    "LC_MONETARY",
    "LC_NUMERIC",
    "LC_TIME",
    "PATH",
    "PWD",
    "SHELL",
    "TERM",
    "TMPDIR",
    "LD_LIBRARY_PATH",
    "LD_PRELOAD",
    "POSIXLY_CORRECT",
    "HOSTALIASES",
    "TZ",
    "TZDIR",
    "TERMCAP",
    "COLUMNS",
    "LINES",
];

/// Immutable set of environment key names allowed to reach the child.
///
/// Matching is an exact, case-sensitive byte comparison.
#[derive(Debug, Clone, Copy)]
pub struct Allowlist<'a> {
    keys: &'a [&'a str],
}

impl<'a> Allowlist<'a> {
    /// The built-in allowlist.
    pub const DEFAULT: Allowlist<'static> = Allowlist { keys: DEFAULT_KEYS };

    pub const fn new(keys: &'a [&'a str]) -> Self {
        Allowlist { keys }
    }

    /// Is the key (the bytes before the `=`) allowed?
    ///
    /// Does not allocate, so it may be called in a forked child.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.keys.iter().any(|k| k.as_bytes() == key)
    }

    pub fn keys(&self) -> &'a [&'a str] {
        self.keys
    }
}

impl Default for Allowlist<'static> {
    fn default() -> Self {
        Allowlist::DEFAULT
    }
}

/// Describes how to launch the command.
///
/// The additional environment entries are borrowed `KEY=VALUE` strings;
/// they are never copied, only referenced from the child's environment.
pub struct LaunchEnv<'a> {
    pub command: &'a str,
    pub shell: PathBuf,
    pub allowlist: Allowlist<'a>,
    pub additional_env: Option<&'a [&'a CStr]>,
}

impl<'a> LaunchEnv<'a> {
    /// Run `command` through `/bin/sh` with the default allowlist and no
    /// additional environment.
    pub fn new(command: &'a str) -> Self {
        LaunchEnv {
            command,
            shell: PathBuf::from(DEFAULT_SHELL),
            allowlist: Allowlist::DEFAULT,
            additional_env: None,
        }
    }

    /// Use the shell found on the `PATH` under the given name.
    pub fn with_shell(mut self, name: &str) -> Result<Self, SpawnError> {
        self.shell = which::which(name)?;
        Ok(self)
    }

    pub fn with_allowlist(mut self, allowlist: Allowlist<'a>) -> Self {
        self.allowlist = allowlist;
        self
    }

    pub fn with_additional_env(mut self, env: &'a [&'a CStr]) -> Self {
        self.additional_env = Some(env);
        self
    }
}
