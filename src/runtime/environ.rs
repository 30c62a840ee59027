// SPDX-License-Identifier: MIT

//! Build environment arrays for the child process.
//!
//! An environment array is a caller-owned slice of `Option<&CStr>`, where
//! each `Some` holds a `KEY=VALUE` entry and `None` is the terminating
//! sentinel.  The slice length is the capacity, so at most `len - 1` real
//! entries fit.  Entries are only ever borrowed, never copied or modified,
//! which means an array cannot outlive the strings it was built from.
//!
//! `filter_environment`, `append_environment` and `InheritedEnv` neither
//! allocate nor take a lock, since they run inside the forked child between
//! `fork` and `execve`.

use std::ffi::CStr;

use crate::runtime::{error::SpawnError, spawn::Allowlist};

/// Keys this long or longer are skipped when filtering.
pub const MAX_KEY_LEN: usize = 256;

/// Copy the allowlisted entries of `input` into `out`, in order.
///
/// Entries without a `=` and entries with an over-long key are skipped.
/// Matching entries past the capacity of `out` are dropped.  With no input,
/// `out` receives only the sentinel.
///
/// Returns the number of slots used, including the sentinel.
pub fn filter_environment<'a, 'b: 'a, I>(
    out: &mut [Option<&'a CStr>],
    input: Option<I>,
    allowlist: &Allowlist<'_>,
) -> Result<usize, SpawnError>
where
    I: IntoIterator<Item = &'b CStr>,
{
    if out.is_empty() {
        return Err(SpawnError::InvalidArgument("environment buffer has no capacity"));
    }
    let last = out.len() - 1;
    let mut used = 0;

    if let Some(input) = input {
        for entry in input {
            let Some(key) = entry_key(entry) else {
                continue;
            };
            if key.len() >= MAX_KEY_LEN || !allowlist.contains(key) {
                continue;
            }
            if used == last {
                break;
            }
            out[used] = Some(entry);
            used += 1;
        }
    }

    out[used] = None;
    Ok(used + 1)
}

/// Append `additional` entries after the entries already in `out`.
///
/// The end of `out` is found by scanning for the sentinel.  Entries that do
/// not fit are dropped.  Keys are not de-duplicated; if a key appears twice,
/// which occurrence wins is up to the program that reads the environment.
///
/// An `out` that holds no sentinel at all is treated as full, and its last
/// slot is overwritten with the sentinel.
///
/// Returns the number of slots used, including the sentinel, on every path.
/// That holds when `additional` is absent too: `[A, None]` reports 2.
pub fn append_environment<'a, 'b: 'a, I>(
    out: &mut [Option<&'a CStr>],
    additional: Option<I>,
) -> Result<usize, SpawnError>
where
    I: IntoIterator<Item = &'b CStr>,
{
    if out.is_empty() {
        return Err(SpawnError::InvalidArgument("environment buffer has no capacity"));
    }
    let last = out.len() - 1;
    let mut used = out.iter().position(Option::is_none).unwrap_or(out.len()).min(last);

    if let Some(additional) = additional {
        for entry in additional {
            if used == last {
                break;
            }
            out[used] = Some(entry);
            used += 1;
        }
    }

    out[used] = None;
    Ok(used + 1)
}

/// Build a `KEY=VALUE` entry for use as additional environment.
///
/// Allocates; call it before launching.
pub fn env_entry(key: &str, value: &str) -> Result<std::ffi::CString, SpawnError> {
    if key.is_empty() {
        return Err(SpawnError::InvalidArgument("environment key is empty"));
    }
    if key.contains('=') {
        return Err(SpawnError::InvalidArgument("environment key contains '='"));
    }
    let mut entry = String::with_capacity(key.len() + value.len() + 1);
    entry.push_str(key);
    entry.push('=');
    entry.push_str(value);
    Ok(std::ffi::CString::new(entry)?)
}

/// The key part of a `KEY=VALUE` entry, or `None` without a `=`.
fn entry_key(entry: &CStr) -> Option<&[u8]> {
    let bytes = entry.to_bytes();
    bytes.iter().position(|b| *b == b'=').map(|eq| &bytes[..eq])
}

#[cfg(unix)]
mod inherited {
    use std::ffi::{c_char, CStr};

    unsafe extern "C" {
        static environ: *const *const c_char;
    }

    /// Borrowed, allocation-free walk over the process environment.
    ///
    /// Reads the C `environ` table directly, so it may be used in a forked
    /// child.  Yields the entries exactly as stored, malformed ones included.
    pub struct InheritedEnv {
        next: *const *const c_char,
    }

    impl InheritedEnv {
        /// # Safety
        ///
        /// The environment must not be modified (`setenv`, `putenv`, ...)
        /// while the iterator or any entry it yielded is alive.  In a
        /// freshly forked child, with no other threads, this holds.
        pub unsafe fn current() -> Self {
            InheritedEnv {
                next: unsafe { environ },
            }
        }
    }

    impl Iterator for InheritedEnv {
        type Item = &'static CStr;

        fn next(&mut self) -> Option<Self::Item> {
            if self.next.is_null() {
                return None;
            }
            let entry = unsafe { *self.next };
            if entry.is_null() {
                return None;
            }
            self.next = unsafe { self.next.add(1) };
            Some(unsafe { CStr::from_ptr(entry) })
        }
    }
}

#[cfg(unix)]
pub use inherited::InheritedEnv;
