//! # nowait_exec
//!
//! Launch helper commands from long-running daemons without waiting for them,
//! passing only an allowlisted environment and none of the daemon's open
//! file descriptors beyond stdio.

pub mod runtime;


pub use runtime::environ::{append_environment, env_entry, filter_environment};
#[cfg(unix)]
pub use runtime::environ::InheritedEnv;
pub use runtime::error::SpawnError;
pub use runtime::spawn::{Allowlist, LaunchEnv};

#[cfg(target_os = "linux")]
pub use runtime::{close_fds_above, spawn_nowait, system_nowait};
