//! Which file descriptors the launched command inherits.

use nix::unistd::{fork, ForkResult};

use crate::{close_fds_above, system_nowait};

use super::util;

/// A descriptor without close-on-exec in the launching process is still
/// closed before the command runs, and stays open in the launcher.
#[test]
fn open_descriptor_is_not_inherited() {
    util::init_logging();
    let out = tempfile::NamedTempFile::new().unwrap();
    let fd = util::open_inheritable_fd(200);

    let command = format!(
        "if [ -e /proc/$$/fd/{fd} ]; then echo leaked > {out}; else echo clean > {out}; fi",
        out = util::sh_quote(out.path()),
    );
    let res = system_nowait(&command, None);
    assert!(util::is_open(fd), "launcher lost its own descriptor");
    util::close_fd(fd);

    let pid = res.expect("launch failed");
    assert_eq!(util::wait_exit_code(pid), 0);
    assert_eq!(std::fs::read_to_string(out.path()).unwrap(), "clean\n");
}

/// stdio is kept.
#[test]
fn stdio_is_inherited() {
    util::init_logging();
    let out = tempfile::NamedTempFile::new().unwrap();
    let command = format!(
        "for n in 0 1 2; do [ -e /proc/$$/fd/$n ] || exit 3; done; echo ok > {}",
        util::sh_quote(out.path()),
    );
    let pid = system_nowait(&command, None).expect("launch failed");
    assert_eq!(util::wait_exit_code(pid), 0);
    assert_eq!(std::fs::read_to_string(out.path()).unwrap(), "ok\n");
}

/// The public pruning call, run in a forked copy of the test process.
#[test]
fn close_fds_above_public_call() {
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => assert_eq!(util::wait_exit_code(child), 0),
        Ok(ForkResult::Child) => {
            let fd = util::open_inheritable_fd(40);
            let code = if close_fds_above(2).is_err() {
                1
            } else if util::is_open(fd) {
                2
            } else if !util::is_open(2) {
                3
            } else {
                0
            };
            unsafe { nix::libc::_exit(code) }
        }
        Err(e) => panic!("fork failed: {}", e),
    }
}
