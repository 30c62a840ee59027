// SPDX-License-Identifier: MIT

//! Spawns the process with a scoped environment and descriptor table.
//! Specific to Linux.  Uses `/proc/self/fd` to find open descriptors.

mod child_log;
pub(crate) mod fd;
mod launch;

pub(crate) use launch::launch_nowait;
pub use launch::{ENV_CAPACITY, EXEC_FAILED_STATUS};
