//! Shared helpers for spawning child processes.

use std::ffi::OsStr;
use std::process::Stdio;

use tokio::process::Command;

/// Build a `Command` the way every process spawned here needs it: stdin
/// detached and, on Windows, no console window popping up per child.
pub fn detached_command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    cmd.stdin(Stdio::null());
    apply_creation_flags(&mut cmd);
    cmd
}

#[cfg(target_os = "windows")]
fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x08000000;
    cmd.creation_flags(CREATE_NO_WINDOW)
}

#[cfg(not(target_os = "windows"))]
fn apply_creation_flags(cmd: &mut Command) -> &mut Command {
    cmd
}
