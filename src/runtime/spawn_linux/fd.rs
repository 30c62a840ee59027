// SPDX-License-Identifier: MIT

//! Close inherited file descriptors.
//!
//! The open descriptors are discovered by listing `/proc/self/fd`.  The
//! listing is read with raw `open(2)` and `getdents64(2)` calls into a stack
//! buffer, and closing goes straight to `close(2)` without the nix layers,
//! so none of this allocates memory.  That lets the child call it between
//! `fork` and `execve`.

use std::{ffi::CStr, os::fd::RawFd};

use nix::{errno::Errno, libc};

const PROC_SELF_FD: &CStr = c"/proc/self/fd";

/// Size of the stack buffer handed to `getdents64`.
const DIRENT_BUF_LEN: usize = 2048;

// Offsets into `struct linux_dirent64`:
//   u64 d_ino; i64 d_off; u16 d_reclen; u8 d_type; char d_name[];
const DIRENT_RECLEN_OFFSET: usize = 16;
const DIRENT_NAME_OFFSET: usize = 19;

/// Close every descriptor listed in `/proc/self/fd` that is above
/// `last_fd_to_keep`, except the one used to read the listing.
///
/// `on_close_error` is told about each descriptor that fails to close;
/// pruning continues regardless.  Returns the errno if the listing cannot
/// be read.
pub(crate) fn close_fds_above_with<F>(last_fd_to_keep: RawFd, mut on_close_error: F) -> Result<(), Errno>
where
    F: FnMut(RawFd, Errno),
{
    let dir_fd = unsafe {
        libc::open(
            PROC_SELF_FD.as_ptr(),
            libc::O_RDONLY | libc::O_DIRECTORY | libc::O_CLOEXEC,
        )
    };
    if dir_fd < 0 {
        return Err(Errno::last());
    }

    let mut buf = [0u8; DIRENT_BUF_LEN];
    let res = loop {
        let read = unsafe {
            libc::syscall(
                libc::SYS_getdents64,
                dir_fd,
                buf.as_mut_ptr(),
                buf.len(),
            )
        };
        if read < 0 {
            break Err(Errno::last());
        }
        if read == 0 {
            break Ok(());
        }

        let read = read as usize;
        let mut offset = 0;
        while offset + DIRENT_NAME_OFFSET <= read {
            let reclen = u16::from_ne_bytes([
                buf[offset + DIRENT_RECLEN_OFFSET],
                buf[offset + DIRENT_RECLEN_OFFSET + 1],
            ]) as usize;
            if reclen == 0 || offset + reclen > read {
                break;
            }
            let name = &buf[offset + DIRENT_NAME_OFFSET..offset + reclen];
            offset += reclen;

            let Some(fd) = parse_fd(name) else {
                // "." and ".."
                continue;
            };
            if fd <= last_fd_to_keep || fd == dir_fd {
                continue;
            }
            if unsafe { libc::close(fd) } != 0 {
                on_close_error(fd, Errno::last());
            }
        }
    };

    unsafe { libc::close(dir_fd) };
    res
}

/// Close every descriptor from `last_fd_to_keep + 1` up to the process limit.
///
/// Used by the child when `/proc` is not mounted.  This may be imperfect if
/// the system has a very high limit on open FDs.
pub(crate) fn close_fds_above_brute_force(last_fd_to_keep: RawFd) {
    let max_fd = match nix::unistd::sysconf(nix::unistd::SysconfVar::OPEN_MAX) {
        Ok(Some(n)) => n as libc::c_int,
        _ => 1024,
    };
    for fd in (last_fd_to_keep + 1).max(0)..max_fd {
        // Ignore errors; most of these are not open.
        let _ = unsafe { libc::close(fd) };
    }
}

/// Parse a NUL-terminated directory entry name as a descriptor number.
fn parse_fd(name: &[u8]) -> Option<RawFd> {
    let mut fd: RawFd = 0;
    let mut digits = 0;
    for &b in name {
        if b == 0 {
            break;
        }
        if !b.is_ascii_digit() {
            return None;
        }
        fd = fd.checked_mul(10)?.checked_add((b - b'0') as RawFd)?;
        digits += 1;
    }
    if digits == 0 { None } else { Some(fd) }
}
