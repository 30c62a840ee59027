// SPDX-License-Identifier: MIT

//! Report problems from inside the forked child.
//!
//! Between `fork` and `execve` the `log` facade can't be used: the logger
//! may allocate or take a lock that another thread held at fork time.
//! Instead, messages are formatted into a fixed stack buffer and written to
//! stderr with a single `write(2)`.  Messages that don't fit are cut short.

use std::fmt;

use nix::libc;

use crate::runtime::LOG_TARGET;

const LINE_LEN: usize = 512;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Level {
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// One log line, built on the stack.
pub(crate) struct LogLine {
    buf: [u8; LINE_LEN],
    len: usize,
}

impl LogLine {
    pub(crate) fn new(level: Level) -> Self {
        let mut line = LogLine {
            buf: [0; LINE_LEN],
            len: 0,
        };
        let _ = fmt::Write::write_fmt(
            &mut line,
            format_args!("[{} {} child] ", level.as_str(), LOG_TARGET),
        );
        line
    }

    /// Append raw bytes, for values that need not be UTF-8 (the command).
    pub(crate) fn push_bytes(&mut self, bytes: &[u8]) {
        // Keep one byte for the trailing newline.
        let room = LINE_LEN - 1 - self.len;
        let n = bytes.len().min(room);
        self.buf[self.len..self.len + n].copy_from_slice(&bytes[..n]);
        self.len += n;
    }

    #[cfg(test)]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Write the line plus a newline to stderr.
    pub(crate) fn emit(mut self) {
        self.buf[self.len] = b'\n';
        self.len += 1;
        // Nothing useful can be done if stderr is gone.
        let _ = unsafe {
            libc::write(
                libc::STDERR_FILENO,
                self.buf.as_ptr().cast(),
                self.len,
            )
        };
    }
}

impl fmt::Write for LogLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_bytes(s.as_bytes());
        Ok(())
    }
}

/// Log a formatted message at the given level.
pub(crate) fn log(level: Level, args: fmt::Arguments<'_>) {
    let mut line = LogLine::new(level);
    let _ = fmt::Write::write_fmt(&mut line, args);
    line.emit();
}
